//! Displacement errors.

use crowdnce_core::euclidean;
use ndarray::{ArrayView2, ArrayView3, ArrayView4};

fn point(traj: &ArrayView2<'_, f32>, t: usize) -> [f32; 2] {
    [traj[[t, 0]], traj[[t, 1]]]
}

/// Average displacement error between two `[T, 2]` trajectories.
pub fn ade(pred: ArrayView2<'_, f32>, truth: ArrayView2<'_, f32>) -> f32 {
    let t = pred.nrows().min(truth.nrows());
    if t == 0 {
        return 0.0;
    }
    let sum: f32 = (0..t)
        .map(|s| euclidean(point(&pred, s), point(&truth, s)))
        .sum();
    sum / t as f32
}

/// Final displacement error between two `[T, 2]` trajectories.
pub fn fde(pred: ArrayView2<'_, f32>, truth: ArrayView2<'_, f32>) -> f32 {
    let t = pred.nrows().min(truth.nrows());
    if t == 0 {
        return 0.0;
    }
    euclidean(point(&pred, t - 1), point(&truth, t - 1))
}

/// Best-of-K ADE and FDE per agent.
///
/// `preds` is `[K, T, N, 2]`, `truth` is `[T, N, 2]`. The minimum is
/// taken independently for ADE and FDE.
pub fn best_of_k(preds: ArrayView4<'_, f32>, truth: ArrayView3<'_, f32>) -> (Vec<f32>, Vec<f32>) {
    let (k, _, n, _) = preds.dim();
    let mut best_ade = vec![f32::INFINITY; n];
    let mut best_fde = vec![f32::INFINITY; n];
    for draw in 0..k {
        for agent in 0..n {
            let p = preds.slice(ndarray::s![draw, .., agent, ..]);
            let g = truth.slice(ndarray::s![.., agent, ..]);
            best_ade[agent] = best_ade[agent].min(ade(p, g));
            best_fde[agent] = best_fde[agent].min(fde(p, g));
        }
    }
    (best_ade, best_fde)
}
