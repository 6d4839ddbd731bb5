//! Scene batches and contrastive seed construction.
//!
//! A [`SceneBatch`] holds one scene exactly as the dataset collaborator
//! yields it, with every per-step array laid out time-major
//! (`[T, N, ...]`). Helpers here derive the arrays the contrastive path
//! needs: the neighbour mask without self-loops, the positive seeds and
//! the per-primary negative seeds.

use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis};

use crate::error::CoreError;

/// One scene of observed and future trajectories.
#[derive(Clone, Debug)]
pub struct SceneBatch {
    /// Absolute observed positions, `[T_obs, N, 2]`.
    pub obs_traj: Array3<f32>,
    /// Absolute future positions, `[T_pred, N, 2]`.
    pub pred_traj_gt: Array3<f32>,
    /// Relative observed displacements, `[T_obs, N, 2]`.
    pub obs_traj_rel: Array3<f32>,
    /// Relative future displacements, `[T_pred, N, 2]`.
    pub pred_traj_gt_rel: Array3<f32>,
    /// Non-linearity flag per agent, `[N]`.
    pub non_linear: Array1<f32>,
    /// Per-agent per-frame loss mask, `[N, T_obs + T_pred]`.
    pub loss_mask: Array2<f32>,
    /// Observed graph node features, `[T_obs, N, 2]`.
    pub v_obs: Array3<f32>,
    /// Observed graph adjacency, `[T_obs, N, N]`.
    pub a_obs: Array3<f32>,
    /// Future graph node features, `[T_pred, N, 2]`.
    pub v_tr: Array3<f32>,
    /// Future graph adjacency, `[T_pred, N, N]`.
    pub a_tr: Array3<f32>,
    /// Collision-free flag per agent, if the dataset provides it.
    pub safety: Option<Array1<bool>>,
}

impl SceneBatch {
    /// Number of agents in the scene.
    pub fn num_agents(&self) -> usize {
        self.obs_traj.dim().1
    }

    /// Number of observed frames.
    pub fn obs_len(&self) -> usize {
        self.obs_traj.dim().0
    }

    /// Number of future frames.
    pub fn pred_len(&self) -> usize {
        self.pred_traj_gt.dim().0
    }

    /// Check that every array agrees on `N`, `T_obs` and `T_pred`.
    pub fn validate(&self) -> Result<(), CoreError> {
        let n = self.num_agents();
        let (to, tp) = (self.obs_len(), self.pred_len());
        if n == 0 {
            return Err(CoreError::EmptyScene);
        }
        if to == 0 {
            return Err(CoreError::FrameOutOfRange { what: "observed frames", index: 0, len: 0 });
        }

        let checks: [(&'static str, &[usize], Vec<usize>); 9] = [
            ("obs_traj", self.obs_traj.shape(), vec![to, n, 2]),
            ("pred_traj_gt", self.pred_traj_gt.shape(), vec![tp, n, 2]),
            ("obs_traj_rel", self.obs_traj_rel.shape(), vec![to, n, 2]),
            ("pred_traj_gt_rel", self.pred_traj_gt_rel.shape(), vec![tp, n, 2]),
            ("loss_mask", self.loss_mask.shape(), vec![n, to + tp]),
            ("v_obs", self.v_obs.shape(), vec![to, n, 2]),
            ("a_obs", self.a_obs.shape(), vec![to, n, n]),
            ("v_tr", self.v_tr.shape(), vec![tp, n, 2]),
            ("a_tr", self.a_tr.shape(), vec![tp, n, n]),
        ];
        for (what, actual, expected) in checks {
            if actual != expected.as_slice() {
                return Err(CoreError::shape(what, &expected, actual));
            }
        }
        if self.non_linear.len() != n {
            return Err(CoreError::shape("non_linear", &[n], self.non_linear.shape()));
        }
        if let Some(safety) = &self.safety {
            if safety.len() != n {
                return Err(CoreError::shape("safety", &[n], safety.shape()));
            }
        }
        Ok(())
    }

    /// Absolute position of every agent at the last observed frame, `[N, 2]`.
    pub fn last_observed(&self) -> Array2<f32> {
        self.obs_traj.index_axis(Axis(0), self.obs_len() - 1).to_owned()
    }

    /// Graph adjacency at `frame` as a boolean `[N, N]` mask with the
    /// diagonal cleared.
    pub fn adjacency_mask(&self, frame: usize) -> Result<Array2<bool>, CoreError> {
        if frame >= self.obs_len() {
            return Err(CoreError::FrameOutOfRange {
                what: "adjacency frame",
                index: frame,
                len: self.obs_len(),
            });
        }
        let mut mask = self.a_obs.index_axis(Axis(0), frame).mapv(|a| a != 0.0);
        mask.diag_mut().fill(false);
        Ok(mask)
    }

    /// Neighbour mask `[N, N-1]`: row `i` is the adjacency row of `i` with
    /// column `i` removed, remaining columns in original order.
    pub fn neighbor_mask(&self, frame: usize) -> Result<Array2<bool>, CoreError> {
        let square = self.adjacency_mask(frame)?;
        Ok(remove_diagonal(square.view()))
    }

    /// Decoder input for teacher forcing, `[T_pred, N, 2]`.
    ///
    /// Frame 0 is the last observed node feature; frames `1..T_pred` are the
    /// ground-truth future features at the same index.
    pub fn teacher_forced_future(&self) -> Array3<f32> {
        let tp = self.pred_len();
        let mut future = self.v_tr.clone();
        if tp > 0 {
            future
                .index_axis_mut(Axis(0), 0)
                .assign(&self.v_obs.index_axis(Axis(0), self.obs_len() - 1));
        }
        future
    }

    /// Observed history flattened per agent, `[N, T_obs * 2]`, frame-major.
    pub fn history_descriptor(&self) -> Array2<f32> {
        let (to, n, _) = self.v_obs.dim();
        let mut out = Array2::zeros((n, to * 2));
        for agent in 0..n {
            for t in 0..to {
                out[[agent, 2 * t]] = self.v_obs[[t, agent, 0]];
                out[[agent, 2 * t + 1]] = self.v_obs[[t, agent, 1]];
            }
        }
        out
    }

    /// Indices of agents kept by the safety filter.
    ///
    /// With the filter disabled, or when the dataset carries no safety
    /// flags, every agent is kept.
    pub fn safe_agents(&self, filter: bool) -> Vec<u32> {
        match (&self.safety, filter) {
            (Some(flags), true) => flags
                .iter()
                .enumerate()
                .filter(|(_, &safe)| safe)
                .map(|(i, _)| i as u32)
                .collect(),
            _ => (0..self.num_agents() as u32).collect(),
        }
    }
}

/// Drop the diagonal of a square mask, giving `[N, N-1]`.
pub fn remove_diagonal(square: ArrayView2<'_, bool>) -> Array2<bool> {
    let n = square.nrows();
    let cols = n.saturating_sub(1);
    let mut out = Array2::from_elem((n, cols), false);
    for i in 0..n {
        let mut col = 0;
        for j in (0..n).filter(|&j| j != i) {
            out[[i, col]] = square[[i, j]];
            col += 1;
        }
    }
    out
}

/// Positive seeds `[N, H, 2]`: each agent's first `horizon` future positions.
pub fn positive_seeds(
    pred_traj_gt: ArrayView3<'_, f32>,
    horizon: usize,
) -> Result<Array3<f32>, CoreError> {
    let tp = pred_traj_gt.dim().0;
    if horizon == 0 || horizon > tp {
        return Err(CoreError::FrameOutOfRange { what: "contrast horizon", index: horizon, len: tp });
    }
    Ok(pred_traj_gt
        .slice(s![..horizon, .., ..])
        .permuted_axes([1, 0, 2])
        .to_owned())
}

/// Negative seeds `[N, H, N-1, 2]` built by rotating the primary agent.
///
/// Row `i` gathers the future positions of every agent except `i`, by
/// index, keeping the remaining agents in their original order.
pub fn negative_seeds(
    pred_traj_gt: ArrayView3<'_, f32>,
    horizon: usize,
) -> Result<Array4<f32>, CoreError> {
    let (tp, n, _) = pred_traj_gt.dim();
    if horizon == 0 || horizon > tp {
        return Err(CoreError::FrameOutOfRange { what: "contrast horizon", index: horizon, len: tp });
    }

    let neighbours = n.saturating_sub(1);
    let mut out = Array4::zeros((n, horizon, neighbours, 2));
    for primary in 0..n {
        for (slot, other) in (0..n).filter(|&j| j != primary).enumerate() {
            for t in 0..horizon {
                out[[primary, t, slot, 0]] = pred_traj_gt[[t, other, 0]];
                out[[primary, t, slot, 1]] = pred_traj_gt[[t, other, 1]];
            }
        }
    }
    Ok(out)
}
