//! Stochastic K-sample rollout.
//!
//! Validation samples all K trajectories from one teacher-forced forward
//! pass ([`RolloutMode::OneShot`]). Testing decodes autoregressively and at
//! every step keeps, per agent, the draw closest to the ground truth before
//! feeding it back ([`RolloutMode::Oracle`]); the final parameters are then
//! sampled K times like the one-shot mode.

use candle_core::{Device, Tensor};
use crowdnce_core::{euclidean, rel_to_abs, sample_trajectories, CoreError, SceneBatch};
use crowdnce_model::{array3_from_tensor, tensor_from_array, TrajectoryPredictor};
use ndarray::{s, Array2, Array3, Array4, ArrayView2, ArrayView3, ArrayView4, Axis};
use rand::Rng;

use crate::error::TrainError;

/// How the decoder input is built during evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RolloutMode {
    /// Ground-truth decoder input, one forward pass.
    OneShot,
    /// Autoregressive decoding with best-of-K selection against the truth.
    Oracle,
}

/// Convert relative samples `[K, T, N, 2]` into absolute positions anchored
/// at `origin` (`[N, 2]`).
pub fn to_absolute(rel: ArrayView4<'_, f32>, origin: ArrayView2<'_, f32>) -> Result<Array4<f32>, CoreError> {
    let mut out = Array4::zeros(rel.raw_dim());
    for (draw, mut slot) in out.axis_iter_mut(Axis(0)).enumerate() {
        slot.assign(&rel_to_abs(rel.index_axis(Axis(0), draw), origin)?);
    }
    Ok(out)
}

/// Per agent, the candidate `[K, N, 2]` closest to `truth` (`[N, 2]`).
/// Ties keep the earliest draw.
pub fn best_of_k_step(candidates: ArrayView3<'_, f32>, truth: ArrayView2<'_, f32>) -> Array2<f32> {
    let (k, n, _) = candidates.dim();
    let mut out = Array2::zeros((n, 2));
    for agent in 0..n {
        let target = [truth[[agent, 0]], truth[[agent, 1]]];
        let mut best = (f32::INFINITY, 0);
        for draw in 0..k {
            let d = euclidean(
                [candidates[[draw, agent, 0]], candidates[[draw, agent, 1]]],
                target,
            );
            if d < best.0 {
                best = (d, draw);
            }
        }
        out.row_mut(agent)
            .assign(&candidates.slice(s![best.1, agent, ..]));
    }
    out
}

/// Teacher-forced parameters `[T_pred, N, 5]` for `scene`.
pub fn one_shot_params<P: TrajectoryPredictor>(
    predictor: &P,
    scene: &SceneBatch,
    device: &Device,
) -> Result<Tensor, TrainError> {
    let observed = tensor_from_array(&scene.v_obs, device)?;
    let adjacency = tensor_from_array(&scene.a_obs, device)?;
    let future = tensor_from_array(&scene.teacher_forced_future(), device)?;
    let output = predictor.forward(&observed, &adjacency, &future, false)?;
    Ok(output.params.detach())
}

/// Autoregressive best-of-K decoding.
///
/// The decoder input starts as the last observed relative frame. Each of
/// the `T_pred` steps runs the predictor on the growing input, samples `k`
/// draws from the newest step, and appends the per-agent draw closest to
/// the ground-truth relative step. Returns the parameters `[T_pred, N, 5]`
/// of the final forward pass, detached.
pub fn oracle_decode<P, R>(
    predictor: &P,
    scene: &SceneBatch,
    k: usize,
    device: &Device,
    rng: &mut R,
) -> Result<Array3<f32>, TrainError>
where
    P: TrajectoryPredictor,
    R: Rng + ?Sized,
{
    let (to, tp) = (scene.obs_len(), scene.pred_len());
    let n = scene.num_agents();
    let observed = tensor_from_array(&scene.v_obs, device)?;
    let adjacency = tensor_from_array(&scene.a_obs, device)?;

    let mut future = scene.v_obs.slice(s![to - 1..to, .., ..]).to_owned();
    let mut last = Array3::zeros((0, n, crowdnce_core::PARAMS_PER_STEP));
    for step in 0..tp {
        let input = tensor_from_array(&future, device)?;
        let output = predictor.forward(&observed, &adjacency, &input, false)?;
        last = array3_from_tensor(&output.params.detach())?;
        if step + 1 == tp {
            break;
        }

        let newest = last.slice(s![last.dim().0 - 1.., .., ..]);
        let draws = sample_trajectories(newest, k, rng)?;
        let chosen = best_of_k_step(
            draws.index_axis(Axis(1), 0),
            scene.v_tr.index_axis(Axis(0), step),
        );
        future
            .push(Axis(0), chosen.view())
            .map_err(|_| CoreError::ShapeMismatch {
                what: "decoder step",
                expected: vec![n, 2],
                actual: chosen.shape().to_vec(),
            })?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn absolute_positions_start_from_origin() {
        let rel = Array4::from_elem((2, 3, 1, 2), 1.0f32);
        let origin = array![[10.0f32, -5.0]];
        let abs = to_absolute(rel.view(), origin.view()).unwrap();
        assert_abs_diff_eq!(abs[[0, 0, 0, 0]], 11.0);
        assert_abs_diff_eq!(abs[[1, 2, 0, 1]], -2.0);
    }

    #[test]
    fn best_draw_is_chosen_per_agent() {
        let candidates = array![
            [[0.0f32, 0.0], [5.0, 5.0]],
            [[1.0, 1.0], [0.0, 0.0]],
        ];
        let truth = array![[0.9f32, 1.1], [4.0, 4.0]];
        let chosen = best_of_k_step(candidates.view(), truth.view());
        assert_eq!(chosen, array![[1.0, 1.0], [5.0, 5.0]]);
    }
}
