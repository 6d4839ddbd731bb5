//! Per-scene evaluation.

use ndarray::{Array2, Array3, Array4, ArrayView3, Axis};

use crate::collision::{collision_curve, interpolate, NUM_INTERP};
use crate::displacement::best_of_k;
use crate::error::MetricsError;

/// Everything a worker needs to score one scene.
#[derive(Clone, Debug)]
pub struct SceneRollout {
    /// Position of the scene in the evaluation set.
    pub scene_index: usize,
    /// Absolute sampled trajectories, `[K, T, N, 2]`.
    pub predictions: Array4<f32>,
    /// Absolute ground truth, `[T, N, 2]`.
    pub truth: Array3<f32>,
    /// Which agents count as neighbours of which, `[N, N]`.
    pub neighbours: Array2<bool>,
}

/// Metrics of one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneMetrics {
    /// Position of the scene in the evaluation set.
    pub scene_index: usize,
    /// Best-of-K ADE per agent.
    pub ade: Vec<f32>,
    /// Best-of-K FDE per agent.
    pub fde: Vec<f32>,
    /// Fraction of the K draws in which each agent collides.
    pub collision_rate: Vec<f64>,
    /// Prediction vs prediction curves, row `n·K + k`.
    pub joint: Array2<f64>,
    /// Prediction vs ground truth curves, row `n·K + k`.
    pub cross: Array2<f64>,
    /// Ground truth vs ground truth curves, one row per agent.
    pub truth: Option<Array2<f64>>,
}

impl SceneRollout {
    fn check(&self) -> Result<(), MetricsError> {
        let (_, t, n, c) = self.predictions.dim();
        let fail = |reason: String| MetricsError::Scene {
            scene_index: self.scene_index,
            reason,
        };
        if c != 2 || self.truth.dim() != (t, n, 2) {
            return Err(fail(format!(
                "predictions {:?} do not match truth {:?}",
                self.predictions.shape(),
                self.truth.shape()
            )));
        }
        if self.neighbours.dim() != (n, n) {
            return Err(fail(format!(
                "neighbour mask {:?} is not {n}x{n}",
                self.neighbours.shape()
            )));
        }
        if t == 0 {
            return Err(fail("empty horizon".into()));
        }
        let finite = self.predictions.iter().chain(self.truth.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(MetricsError::NonFinite {
                scene_index: self.scene_index,
            });
        }
        Ok(())
    }
}

/// Densify time-major `[T, N, 2]` trajectories into agent-major `[N, L, 2]`.
fn densify_agents(trajs: ArrayView3<'_, f32>) -> Array3<f32> {
    let (t, n, _) = trajs.dim();
    let len = (t.max(1) - 1) * (NUM_INTERP + 1) + 1;
    let mut dense = Array3::zeros((n, len, 2));
    for agent in 0..n {
        let traj = trajs.index_axis(Axis(1), agent);
        dense.index_axis_mut(Axis(0), agent).assign(&interpolate(traj));
    }
    dense
}

/// Score one scene.
///
/// With `include_truth` the ground-truth collision curves are computed as
/// well; they depend only on the input and are normally computed once.
pub fn evaluate_scene(scene: &SceneRollout, include_truth: bool) -> Result<SceneMetrics, MetricsError> {
    scene.check()?;
    let (k, _, n, _) = scene.predictions.dim();

    let (ade, fde) = best_of_k(scene.predictions.view(), scene.truth.view());

    let dense_truth = densify_agents(scene.truth.view());
    let dense_pred: Vec<Array3<f32>> = scene.predictions.outer_iter().map(densify_agents).collect();
    let len = dense_truth.dim().1;

    let mut joint = Array2::zeros((n * k, len));
    let mut cross = Array2::zeros((n * k, len));
    let mut collision_rate = vec![0.0; n];
    for agent in 0..n {
        let neighbours = scene.neighbours.row(agent);
        let mut hits = 0usize;
        for (draw, dense) in dense_pred.iter().enumerate() {
            let ego = dense.index_axis(Axis(0), agent);
            let row = agent * k + draw;

            let j = collision_curve(ego, dense.view(), neighbours, agent);
            if j.iter().any(|&c| c) {
                hits += 1;
            }
            joint.row_mut(row).assign(&j.mapv(f64::from));

            let x = collision_curve(ego, dense_truth.view(), neighbours, agent);
            cross.row_mut(row).assign(&x.mapv(f64::from));
        }
        if k > 0 {
            collision_rate[agent] = hits as f64 / k as f64;
        }
    }

    let truth = include_truth.then(|| {
        let mut rows = Array2::zeros((n, len));
        for agent in 0..n {
            let ego = dense_truth.index_axis(Axis(0), agent);
            let curve = collision_curve(ego, dense_truth.view(), scene.neighbours.row(agent), agent);
            rows.row_mut(agent).assign(&curve.mapv(f64::from));
        }
        rows
    });

    Ok(SceneMetrics {
        scene_index: scene.scene_index,
        ade,
        fde,
        collision_rate,
        joint,
        cross,
        truth,
    })
}
