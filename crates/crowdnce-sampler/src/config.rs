//! Sampler configuration.

use serde::{Deserialize, Serialize};

use crate::error::SamplerError;

/// Number of fixed offsets surrounding each neighbour.
pub const ZONE_COUNT: usize = 8;

const ZONE_DIRECTIONS: [[f32; 2]; ZONE_COUNT] = [
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
    [0.707, 0.707],
    [0.707, -0.707],
    [-0.707, 0.707],
    [-0.707, -0.707],
];

/// Immutable parameters of an [`EventSampler`](crate::EventSampler).
///
/// Distances are in metres. `min_separation` is roughly one agent
/// diameter; seeds closer than that, or farther than `max_separation`,
/// are not used as negatives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Boundary ratios for event sampling; scales the local candidate
    /// count (`10 × num_boundary`). Default: 0.
    pub num_boundary: usize,
    /// Radial spread of local candidates beyond `min_separation`. Default: 2.0.
    pub max_range: f32,
    /// First interpolation ratio toward the neighbour. Default: 0.5.
    pub ratio_boundary: f32,
    /// Width of the uniform jitter applied to every sample. Default: 0.05.
    pub noise_local: f32,
    /// Exclusive lower separation bound. Default: 0.2.
    pub min_separation: f32,
    /// Exclusive upper separation bound. Default: 2.5.
    pub max_separation: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_boundary: 0,
            max_range: 2.0,
            ratio_boundary: 0.5,
            noise_local: 0.05,
            min_separation: 0.2,
            max_separation: 2.5,
        }
    }
}

impl SamplerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), SamplerError> {
        let finite = [
            ("max_range", self.max_range),
            ("ratio_boundary", self.ratio_boundary),
            ("noise_local", self.noise_local),
            ("min_separation", self.min_separation),
            ("max_separation", self.max_separation),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{name} must be finite, got {value}")));
            }
        }
        if self.max_range <= 0.0 {
            return Err(invalid(format!("max_range must be positive, got {}", self.max_range)));
        }
        if self.noise_local < 0.0 {
            return Err(invalid(format!("noise_local must be >= 0, got {}", self.noise_local)));
        }
        if self.min_separation < 0.0 || self.max_separation <= self.min_separation {
            return Err(invalid(format!(
                "separation range ({}, {}) is empty",
                self.min_separation, self.max_separation
            )));
        }
        if !(0.0..=1.0).contains(&self.ratio_boundary) {
            return Err(invalid(format!(
                "ratio_boundary must lie in [0, 1], got {}",
                self.ratio_boundary
            )));
        }
        Ok(())
    }

    /// The 8 territory offsets, each `min_separation` away from the neighbour.
    pub fn zone_offsets(&self) -> [[f32; 2]; ZONE_COUNT] {
        ZONE_DIRECTIONS.map(|[x, y]| [x * self.min_separation, y * self.min_separation])
    }

    /// Interpolation ratios `linspace(ratio_boundary, 1, num_boundary)`.
    pub fn boundary_ratios(&self) -> Vec<f32> {
        match self.num_boundary {
            0 => Vec::new(),
            1 => vec![self.ratio_boundary],
            n => {
                let step = (1.0 - self.ratio_boundary) / (n - 1) as f32;
                (0..n).map(|i| self.ratio_boundary + step * i as f32).collect()
            }
        }
    }
}

fn invalid(reason: String) -> SamplerError {
    SamplerError::InvalidConfig { reason }
}
