//! Aggregation across scenes.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::aggregate::{post_process, CollisionCurves};
use crate::error::MetricsError;
use crate::scene::SceneMetrics;

/// Cumulative level reported as the headline collision rate.
const HEADLINE_LEVEL: usize = 2;

/// Metrics pooled over every agent of every scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Mean best-of-K ADE.
    pub ade: f64,
    /// Mean best-of-K FDE.
    pub fde: f64,
    /// Mean per-agent collision frequency.
    pub coll: f64,
    /// Prediction vs prediction curves.
    pub joint: CollisionCurves,
    /// Prediction vs ground truth curves.
    pub cross: CollisionCurves,
    /// Ground truth vs ground truth curves, when computed.
    pub truth: Option<CollisionCurves>,
}

impl EvalSummary {
    /// Joint cumulative collision rate at level 2 (within the first 16
    /// dense points, i.e. the first 3 future frames).
    pub fn col_joint_c4(&self) -> f64 {
        self.joint.cumulative_at(HEADLINE_LEVEL).unwrap_or(0.0)
    }
}

fn stack_rows(parts: &[ArrayView2<'_, f64>]) -> Result<Array2<f64>, MetricsError> {
    concatenate(Axis(0), parts).map_err(|_| MetricsError::BinLayout {
        len: parts.first().map_or(0, |p| p.ncols()),
        group: crate::NUM_INTERP + 1,
    })
}

/// Pool per-scene results.
///
/// Truth curves are produced only if every scene carries them.
pub fn summarize(results: &[SceneMetrics]) -> Result<EvalSummary, MetricsError> {
    let agents: usize = results.iter().map(|r| r.ade.len()).sum();
    if agents == 0 {
        return Err(MetricsError::Empty);
    }
    let ade = results.iter().flat_map(|r| &r.ade).map(|&v| f64::from(v)).sum::<f64>() / agents as f64;
    let fde = results.iter().flat_map(|r| &r.fde).map(|&v| f64::from(v)).sum::<f64>() / agents as f64;
    let coll = results.iter().flat_map(|r| r.collision_rate.iter()).sum::<f64>() / agents as f64;

    let joint: Vec<_> = results.iter().map(|r| r.joint.view()).collect();
    let cross: Vec<_> = results.iter().map(|r| r.cross.view()).collect();
    let joint = post_process(stack_rows(&joint)?.view())?;
    let cross = post_process(stack_rows(&cross)?.view())?;

    let truth = match results.iter().map(|r| r.truth.as_ref().map(|t| t.view())).collect::<Option<Vec<_>>>() {
        Some(parts) => Some(post_process(stack_rows(&parts)?.view())?),
        None => None,
    };

    Ok(EvalSummary {
        ade,
        fde,
        coll,
        joint,
        cross,
        truth,
    })
}

/// Ground-truth collision curves, computed on first evaluation and reused.
#[derive(Clone, Debug, Default)]
pub struct TruthCache {
    curves: Option<CollisionCurves>,
}

impl TruthCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next evaluation must compute truth curves.
    pub fn needs_truth(&self) -> bool {
        self.curves.is_none()
    }

    /// Cached curves.
    pub fn get(&self) -> Option<&CollisionCurves> {
        self.curves.as_ref()
    }

    /// Store freshly computed curves; later calls keep the first value.
    pub fn fill(&mut self, curves: CollisionCurves) -> &CollisionCurves {
        self.curves.get_or_insert(curves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn metrics(ade: Vec<f32>, coll: Vec<f64>, with_truth: bool) -> SceneMetrics {
        let n = ade.len();
        SceneMetrics {
            scene_index: 0,
            fde: ade.iter().map(|v| v * 2.0).collect(),
            ade,
            collision_rate: coll,
            joint: Array2::zeros((n * 2, 56)),
            cross: Array2::zeros((n * 2, 56)),
            truth: with_truth.then(|| Array2::zeros((n, 56))),
        }
    }

    #[test]
    fn means_run_over_agents_not_scenes() {
        let a = metrics(vec![1.0], vec![1.0], true);
        let b = metrics(vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0], true);
        let s = summarize(&[a, b]).unwrap();
        assert_abs_diff_eq!(s.ade, 0.25);
        assert_abs_diff_eq!(s.fde, 0.5);
        assert_abs_diff_eq!(s.coll, 0.25);
        assert_eq!(s.joint.step.len(), 11);
        assert!(s.truth.is_some());
        assert_eq!(s.col_joint_c4(), 0.0);
    }

    #[test]
    fn truth_dropped_when_any_scene_lacks_it() {
        let s = summarize(&[metrics(vec![1.0], vec![0.0], true), metrics(vec![1.0], vec![0.0], false)]).unwrap();
        assert!(s.truth.is_none());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(summarize(&[]), Err(MetricsError::Empty));
    }

    #[test]
    fn cache_keeps_first_curves() {
        let mut cache = TruthCache::new();
        assert!(cache.needs_truth());
        let first = CollisionCurves { step: vec![0.1], cumulative: vec![0.2] };
        cache.fill(first.clone());
        cache.fill(CollisionCurves { step: vec![0.9], cumulative: vec![0.9] });
        assert!(!cache.needs_truth());
        assert_eq!(cache.get(), Some(&first));
    }
}
