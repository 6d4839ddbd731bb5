//! Sampler output.

use ndarray::{Array2, Array3, Array4, Axis};

/// Samples for one scene, re-centred on each agent's observed position.
#[derive(Clone, Debug)]
pub struct ContrastSamples {
    /// Positive samples, `[N, H, 2]`.
    pub positive: Array3<f32>,
    /// Negative samples, `[N, H, M, 2]`.
    pub negative: Array4<f32>,
    /// Validity of each negative, `[N, H, M]`.
    pub valid: Array3<bool>,
}

impl ContrastSamples {
    /// Number of agents.
    pub fn num_agents(&self) -> usize {
        self.positive.dim().0
    }

    /// Number of horizon steps.
    pub fn horizon(&self) -> usize {
        self.positive.dim().1
    }

    /// Number of negatives per `(agent, step)` row.
    pub fn num_negatives(&self) -> usize {
        self.negative.dim().2
    }

    /// `[N, H]` mask of rows holding at least one valid negative.
    pub fn valid_rows(&self) -> Array2<bool> {
        self.valid.map_axis(Axis(2), |lane| lane.iter().any(|&v| v))
    }
}
