//! Collision indicator curves.
//!
//! Trajectories are densified with [`NUM_INTERP`] linearly interpolated
//! points between consecutive frames; two agents collide at a dense point
//! when they are closer than [`COLLISION_THRESHOLD`].

use crowdnce_core::euclidean;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3};

/// Intermediate points inserted between consecutive frames.
pub const NUM_INTERP: usize = 4;

/// Collision distance in metres.
pub const COLLISION_THRESHOLD: f32 = 0.2;

/// Densify a `[T, 2]` trajectory to `[(T-1)·(NUM_INTERP+1) + 1, 2]`.
pub fn interpolate(traj: ArrayView2<'_, f32>) -> Array2<f32> {
    let t = traj.nrows();
    if t == 0 {
        return Array2::zeros((0, 2));
    }
    let stride = NUM_INTERP + 1;
    let mut dense = Array2::zeros(((t - 1) * stride + 1, 2));
    dense.row_mut(0).assign(&traj.row(0));
    for step in 0..t - 1 {
        for i in 0..stride {
            let ratio = (i + 1) as f32 / stride as f32;
            for c in 0..2 {
                dense[[step * stride + i + 1, c]] =
                    traj[[step, c]] * (1.0 - ratio) + traj[[step + 1, c]] * ratio;
            }
        }
    }
    dense
}

/// Collision curve of one agent against a set of others.
///
/// `ego` is the agent's dense trajectory `[L, 2]`; `others` holds dense
/// trajectories of every agent `[N, L, 2]`, and `neighbours[j]` says
/// whether agent `j` is considered. The agent itself (`ego_index`) is
/// always skipped. Entry `l` is true iff some considered agent is within
/// the collision threshold at dense point `l`.
pub fn collision_curve(
    ego: ArrayView2<'_, f32>,
    others: ArrayView3<'_, f32>,
    neighbours: ArrayView1<'_, bool>,
    ego_index: usize,
) -> Array1<bool> {
    let len = ego.nrows();
    let mut curve = Array1::from_elem(len, false);
    for j in 0..others.dim().0 {
        if j == ego_index || !neighbours.get(j).copied().unwrap_or(false) {
            continue;
        }
        for l in 0..len {
            let d = euclidean([ego[[l, 0]], ego[[l, 1]]], [others[[j, l, 0]], others[[j, l, 1]]]);
            if d < COLLISION_THRESHOLD {
                curve[l] = true;
            }
        }
    }
    curve
}
