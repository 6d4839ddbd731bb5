//! Pairwise geometry between agents and sample points.
//!
//! All positions are metric `(x, y)` pairs stored in the innermost axis.

use ndarray::{Array3, ArrayView2, ArrayView3, ArrayView4, Axis};

use crate::error::CoreError;

/// Euclidean distance between two points.
#[inline]
pub fn euclidean(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Separation-range validity between positive and negative seeds.
///
/// `pos` is `[N, H, 2]` and is broadcast over the neighbour axis of `neg`
/// (`[N, H, M, 2]`). Entry `(i, h, j)` of the result is `true` iff the
/// distance between `neg[i, h, j]` and `pos[i, h]` lies strictly inside
/// `(min_separation, max_separation)`. Identical points are never valid.
pub fn valid_pairs(
    pos: ArrayView3<'_, f32>,
    neg: ArrayView4<'_, f32>,
    min_separation: f32,
    max_separation: f32,
) -> Result<Array3<bool>, CoreError> {
    let (n, h, _, c) = neg.dim();
    if c != 2 {
        return Err(CoreError::shape("negative seeds", &[n, h, neg.dim().2, 2], neg.shape()));
    }
    if pos.dim() != (n, h, 2) {
        return Err(CoreError::shape("positive seeds", &[n, h, 2], pos.shape()));
    }

    let diff = &neg - &pos.insert_axis(Axis(2));
    let dist = diff.mapv(|v| v * v).sum_axis(Axis(3)).mapv(f32::sqrt);
    Ok(dist.mapv(|d| d > min_separation && d < max_separation))
}

/// Convert relative displacements `[T, N, 2]` into absolute positions.
///
/// Step `t` of agent `n` is `origin[n] + Σ_{s<=t} rel[s, n]`.
pub fn rel_to_abs(
    rel: ArrayView3<'_, f32>,
    origin: ArrayView2<'_, f32>,
) -> Result<Array3<f32>, CoreError> {
    let (t, n, c) = rel.dim();
    if c != 2 || origin.dim() != (n, 2) {
        return Err(CoreError::shape("origin", &[n, 2], origin.shape()));
    }

    let mut out = Array3::zeros((t, n, 2));
    let mut cursor = origin.to_owned();
    for step in 0..t {
        cursor += &rel.index_axis(Axis(0), step);
        out.index_axis_mut(Axis(0), step).assign(&cursor);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array4};
    use proptest::prelude::*;

    #[test]
    fn identical_points_are_invalid() {
        let pos = Array3::from_elem((1, 1, 2), 1.0f32);
        let neg = Array4::from_elem((1, 1, 3, 2), 1.0f32);
        let valid = valid_pairs(pos.view(), neg.view(), 0.2, 2.5).unwrap();
        assert!(valid.iter().all(|v| !v));
    }

    #[test]
    fn separation_bounds_are_strict() {
        let pos = Array3::zeros((1, 1, 2));
        let mut neg = Array4::zeros((1, 1, 4, 2));
        neg[[0, 0, 0, 0]] = 0.2; // on the lower bound
        neg[[0, 0, 1, 0]] = 1.0; // inside
        neg[[0, 0, 2, 1]] = 2.5; // on the upper bound
        neg[[0, 0, 3, 1]] = 3.0; // outside
        let valid = valid_pairs(pos.view(), neg.view(), 0.2, 2.5).unwrap();
        assert_eq!(
            valid.iter().copied().collect::<Vec<_>>(),
            vec![false, true, false, false]
        );
    }

    #[test]
    fn rejects_mismatched_positive_shape() {
        let pos = Array3::<f32>::zeros((2, 1, 2));
        let neg = Array4::<f32>::zeros((1, 1, 3, 2));
        let err = valid_pairs(pos.view(), neg.view(), 0.2, 2.5).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { what: "positive seeds", .. }));
    }

    #[test]
    fn rel_to_abs_accumulates_from_origin() {
        let rel = array![[[1.0f32, 0.0]], [[1.0, 0.5]], [[0.0, 0.5]]];
        let origin = array![[2.0f32, -1.0]];
        let abs = rel_to_abs(rel.view(), origin.view()).unwrap();
        assert_abs_diff_eq!(abs[[0, 0, 0]], 3.0);
        assert_abs_diff_eq!(abs[[2, 0, 0]], 4.0);
        assert_abs_diff_eq!(abs[[2, 0, 1]], 0.0);
    }

    proptest! {
        #[test]
        fn valid_pairs_respect_separation(
            coords in proptest::collection::vec(-3.0f32..3.0, 2 * 6),
            min_sep in 0.05f32..0.5,
            span in 0.5f32..3.0,
        ) {
            let max_sep = min_sep + span;
            let pos = Array3::from_shape_vec((1, 1, 2), coords[..2].to_vec()).unwrap();
            let neg = Array4::from_shape_vec((1, 1, 5, 2), coords[2..].to_vec()).unwrap();
            let valid = valid_pairs(pos.view(), neg.view(), min_sep, max_sep).unwrap();
            for j in 0..5 {
                let d = euclidean(
                    [pos[[0, 0, 0]], pos[[0, 0, 1]]],
                    [neg[[0, 0, j, 0]], neg[[0, 0, j, 1]]],
                );
                prop_assert_eq!(valid[[0, 0, j]], d > min_sep && d < max_sep);
            }
        }
    }
}
