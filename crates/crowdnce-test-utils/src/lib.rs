//! Test utilities and mock types for crowdnce development.
//!
//! Provides [`synthetic_scene`], a deterministic generator of straight-line
//! pedestrian scenes in the dataset layout, and [`LinearPredictor`], a tiny
//! trainable stand-in for the real graph predictor.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use candle_core::{Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use crowdnce_core::{SceneBatch, PARAMS_PER_STEP};
use crowdnce_model::{PredictorOutput, TrajectoryPredictor};
use ndarray::{Array1, Array2, Array3, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Lateral spacing between synthetic walkers, metres.
pub const LANE_SPACING: f32 = 0.8;

/// `agents` pedestrians walking roughly along +x in parallel lanes.
///
/// Relative arrays hold per-frame displacements (the first observed
/// displacement is zero), every agent is adjacent to every other, and no
/// safety flags are attached.
pub fn synthetic_scene(agents: usize, obs_len: usize, pred_len: usize, seed: u64) -> SceneBatch {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let total = obs_len + pred_len;

    let mut abs = Array3::<f32>::zeros((total, agents, 2));
    for a in 0..agents {
        let vx = 0.35 + rng.random::<f32>() * 0.1;
        let vy = (rng.random::<f32>() - 0.5) * 0.01;
        let y0 = a as f32 * LANE_SPACING;
        for t in 0..total {
            abs[[t, a, 0]] = vx * t as f32;
            abs[[t, a, 1]] = y0 + vy * t as f32;
        }
    }

    let mut rel = Array3::<f32>::zeros((total, agents, 2));
    for t in 1..total {
        let step = &abs.index_axis(Axis(0), t) - &abs.index_axis(Axis(0), t - 1);
        rel.index_axis_mut(Axis(0), t).assign(&step);
    }

    let obs = ndarray::s![..obs_len, .., ..];
    let pred = ndarray::s![obs_len.., .., ..];
    SceneBatch {
        obs_traj: abs.slice(obs).to_owned(),
        pred_traj_gt: abs.slice(pred).to_owned(),
        obs_traj_rel: rel.slice(obs).to_owned(),
        pred_traj_gt_rel: rel.slice(pred).to_owned(),
        non_linear: Array1::zeros(agents),
        loss_mask: Array2::ones((agents, total)),
        v_obs: rel.slice(obs).to_owned(),
        a_obs: Array3::ones((obs_len, agents, agents)),
        v_tr: rel.slice(pred).to_owned(),
        a_tr: Array3::ones((pred_len, agents, agents)),
        safety: None,
    }
}

/// A scene with explicit per-agent safety flags.
pub fn scene_with_safety(agents: usize, safety: &[bool], seed: u64) -> SceneBatch {
    let mut scene = synthetic_scene(agents, 8, 12, seed);
    scene.safety = Some(Array1::from(safety.to_vec()));
    scene
}

/// Minimal trainable predictor.
///
/// Parameters are a linear map of the decoder input frame; the embedding
/// is a linear map of the flattened observed displacements.
#[derive(Debug)]
pub struct LinearPredictor {
    head: Linear,
    embed: Linear,
    obs_len: usize,
    embedding_dim: usize,
}

impl LinearPredictor {
    pub fn new(vb: VarBuilder<'_>, obs_len: usize, embedding_dim: usize) -> Result<Self> {
        Ok(Self {
            head: linear(2, PARAMS_PER_STEP, vb.pp("head"))?,
            embed: linear(obs_len * 2, embedding_dim, vb.pp("embed"))?,
            obs_len,
            embedding_dim,
        })
    }
}

impl TrajectoryPredictor for LinearPredictor {
    fn forward(
        &self,
        observed: &Tensor,
        _adjacency: &Tensor,
        future: &Tensor,
        want_embedding: bool,
    ) -> Result<PredictorOutput> {
        let params = self.head.forward(future)?;
        let embedding = if want_embedding {
            let (_, n, _) = observed.dims3()?;
            let flat = observed
                .permute((1, 0, 2))?
                .contiguous()?
                .reshape((n, self.obs_len * 2))?;
            Some(self.embed.forward(&flat)?)
        } else {
            None
        };
        Ok(PredictorOutput { params, embedding })
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}
