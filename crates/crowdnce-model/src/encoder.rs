//! Sample encoders and the projection head.
//!
//! Sample encoders map 2-D sample positions (plus a horizon time index for
//! the event encoder) to key embeddings; the projection head maps predictor
//! features to query embeddings of the same width.

use candle_core::{Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Encodes sample positions into key embeddings.
pub trait SampleEncoder {
    /// `positions` is `[R, 2]`, `time` is `[R, 1]`; returns `[R, E]`.
    fn encode(&self, positions: &Tensor, time: &Tensor) -> Result<Tensor>;

    /// Key width `E`.
    fn embedding_dim(&self) -> usize;
}

/// Projects per-agent features into query embeddings.
pub trait ProjectionHead {
    /// `features` is `[N, F]`; returns `[N, E]`.
    fn project(&self, features: &Tensor) -> Result<Tensor>;

    /// Query width `E`.
    fn embedding_dim(&self) -> usize;
}

/// Position-only encoder: `2 → hidden → ReLU → head`.
#[derive(Clone, Debug)]
pub struct SpatialEncoder {
    fc1: Linear,
    fc2: Linear,
    head_dim: usize,
}

impl SpatialEncoder {
    /// Build under `vb`.
    pub fn new(vb: VarBuilder<'_>, hidden_dim: usize, head_dim: usize) -> Result<Self> {
        Ok(Self {
            fc1: linear(2, hidden_dim, vb.pp("fc1"))?,
            fc2: linear(hidden_dim, head_dim, vb.pp("fc2"))?,
            head_dim,
        })
    }
}

impl SampleEncoder for SpatialEncoder {
    fn encode(&self, positions: &Tensor, _time: &Tensor) -> Result<Tensor> {
        let h = self.fc1.forward(positions)?.relu()?;
        self.fc2.forward(&h)
    }

    fn embedding_dim(&self) -> usize {
        self.head_dim
    }
}

/// Time-aware encoder.
///
/// Position and time are embedded separately (`Linear + ReLU` each),
/// summed, then passed through `hidden → ReLU → head`.
#[derive(Clone, Debug)]
pub struct EventEncoder {
    spatial: Linear,
    temporal: Linear,
    fc1: Linear,
    fc2: Linear,
    head_dim: usize,
}

impl EventEncoder {
    /// Build under `vb`.
    pub fn new(vb: VarBuilder<'_>, hidden_dim: usize, head_dim: usize) -> Result<Self> {
        Ok(Self {
            spatial: linear(2, hidden_dim, vb.pp("spatial"))?,
            temporal: linear(1, hidden_dim, vb.pp("temporal"))?,
            fc1: linear(hidden_dim, hidden_dim, vb.pp("fc1"))?,
            fc2: linear(hidden_dim, head_dim, vb.pp("fc2"))?,
            head_dim,
        })
    }
}

impl SampleEncoder for EventEncoder {
    fn encode(&self, positions: &Tensor, time: &Tensor) -> Result<Tensor> {
        let state = self.spatial.forward(positions)?.relu()?;
        let time = self.temporal.forward(time)?.relu()?;
        let h = self.fc1.forward(&(state + time)?)?.relu()?;
        self.fc2.forward(&h)
    }

    fn embedding_dim(&self) -> usize {
        self.head_dim
    }
}

/// Projection head: `feat → hidden → ReLU → head`.
#[derive(Clone, Debug)]
pub struct ProjHead {
    fc1: Linear,
    fc2: Linear,
    head_dim: usize,
}

impl ProjHead {
    /// Build under `vb`.
    pub fn new(vb: VarBuilder<'_>, feat_dim: usize, hidden_dim: usize, head_dim: usize) -> Result<Self> {
        Ok(Self {
            fc1: linear(feat_dim, hidden_dim, vb.pp("fc1"))?,
            fc2: linear(hidden_dim, head_dim, vb.pp("fc2"))?,
            head_dim,
        })
    }
}

impl ProjectionHead for ProjHead {
    fn project(&self, features: &Tensor) -> Result<Tensor> {
        let h = self.fc1.forward(features)?.relu()?;
        self.fc2.forward(&h)
    }

    fn embedding_dim(&self) -> usize {
        self.head_dim
    }
}
