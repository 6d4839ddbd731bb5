//! Collision curve post-processing.
//!
//! A raw curve has `1 + G·5` dense points (`56` for 12 frames). The step
//! curve averages the raw rows, drops the final point and averages groups
//! of 5; the cumulative curve reports, for each level `i`, the fraction of
//! rows that collide anywhere within the first `5i + 6` points.

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::collision::NUM_INTERP;
use crate::error::MetricsError;

const GROUP: usize = NUM_INTERP + 1;

/// Reduced collision curves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionCurves {
    /// Mean collision indicator per coarse bin.
    pub step: Vec<f64>,
    /// Fraction of rows with a collision up to each coarse bin.
    pub cumulative: Vec<f64>,
}

impl CollisionCurves {
    /// Cumulative level `i`, if present.
    pub fn cumulative_at(&self, level: usize) -> Option<f64> {
        self.cumulative.get(level).copied()
    }
}

/// Reduce raw `[R, L]` indicator rows to step and cumulative curves.
pub fn post_process(raw: ArrayView2<'_, f64>) -> Result<CollisionCurves, MetricsError> {
    let (rows, len) = raw.dim();
    if rows == 0 {
        return Err(MetricsError::Empty);
    }
    if len == 0 || (len - 1) % GROUP != 0 {
        return Err(MetricsError::BinLayout { len, group: GROUP });
    }
    let levels = (len - 1) / GROUP;

    let Some(column_mean) = raw.mean_axis(Axis(0)) else {
        return Err(MetricsError::Empty);
    };
    let step = (0..levels)
        .map(|g| {
            let bin = column_mean.slice(ndarray::s![g * GROUP..(g + 1) * GROUP]);
            bin.sum() / GROUP as f64
        })
        .collect();

    let cumulative = (0..levels)
        .map(|level| {
            let upto = (level * GROUP + GROUP + 1).min(len);
            let hits: f64 = raw
                .rows()
                .into_iter()
                .map(|row| {
                    row.slice(ndarray::s![..upto])
                        .iter()
                        .copied()
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .sum();
            hits / rows as f64
        })
        .collect();

    Ok(CollisionCurves { step, cumulative })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn all_zero_rows_give_zero_curves() {
        let raw = Array2::<f64>::zeros((2, 56));
        let curves = post_process(raw.view()).unwrap();
        assert_eq!(curves.step, vec![0.0; 11]);
        assert_eq!(curves.cumulative, vec![0.0; 11]);
    }

    #[test]
    fn late_collision_shows_up_cumulatively() {
        let mut raw = Array2::<f64>::zeros((2, 56));
        raw[[0, 20]] = 1.0;
        let curves = post_process(raw.view()).unwrap();
        // Point 20 lives in group 4 (points 20..25).
        assert_abs_diff_eq!(curves.step[4], 0.1);
        assert_eq!(curves.step.iter().filter(|&&v| v > 0.0).count(), 1);
        // Level i covers points ..5i+6: first reached at i = 3.
        assert_eq!(curves.cumulative[2], 0.0);
        assert_abs_diff_eq!(curves.cumulative[3], 0.5);
        assert_abs_diff_eq!(curves.cumulative[10], 0.5);
        assert_eq!(curves.cumulative_at(11), None);
    }

    #[test]
    fn final_point_only_counts_in_last_level() {
        let mut raw = Array2::<f64>::zeros((1, 56));
        raw[[0, 55]] = 1.0;
        let curves = post_process(raw.view()).unwrap();
        assert!(curves.step.iter().all(|&v| v == 0.0));
        assert_eq!(curves.cumulative[9], 0.0);
        assert_eq!(curves.cumulative[10], 1.0);
    }

    #[test]
    fn rejects_bad_layout() {
        let raw = Array2::<f64>::zeros((1, 55));
        assert_eq!(
            post_process(raw.view()),
            Err(MetricsError::BinLayout { len: 55, group: 5 })
        );
        let none = Array2::<f64>::zeros((0, 56));
        assert_eq!(post_process(none.view()), Err(MetricsError::Empty));
    }
}
