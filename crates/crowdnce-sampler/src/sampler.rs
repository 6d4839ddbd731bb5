//! The event sampler.
//!
//! Inputs for a scene of `N` agents and horizon `H`, with `M = N - 1`
//! neighbours per agent:
//!
//! | input | shape |
//! |---|---|
//! | `robot` | `[N, 2]` last observed positions |
//! | `neighbor_mask` | `[N, M]` graph neighbours, diagonal removed |
//! | `pos_seeds` | `[N, H, 2]` |
//! | `neg_seeds` | `[N, H, M, 2]` |
//!
//! Local sampling only looks at the first horizon step and always returns
//! `H = 1`.

use std::f32::consts::PI;

use crowdnce_core::{valid_pairs, CoreError};
use ndarray::{Array3, Array4, ArrayView2, ArrayView3, ArrayView4, Axis};
use rand::Rng;

use crate::config::{SamplerConfig, ZONE_COUNT};
use crate::error::SamplerError;
use crate::samples::ContrastSamples;
use crate::strategy::SamplingStrategy;

/// Local candidates drawn per unit of `num_boundary`.
const LOCAL_CANDIDATES_PER_BOUNDARY: usize = 10;

/// Draws positive and negative samples for the contrastive loss.
#[derive(Clone, Debug)]
pub struct EventSampler {
    config: SamplerConfig,
    strategy: SamplingStrategy,
}

impl EventSampler {
    /// Validate `config` and bind it to a strategy.
    ///
    /// The local strategy needs at least one candidate batch: a
    /// `num_boundary` of 0 is raised to 1 with a warning.
    pub fn new(mut config: SamplerConfig, strategy: SamplingStrategy) -> Result<Self, SamplerError> {
        config.validate()?;
        if strategy == SamplingStrategy::Local && config.num_boundary < 1 {
            tracing::warn!(
                num_boundary = config.num_boundary,
                "local sampling needs num_boundary >= 1, using 1"
            );
            config.num_boundary = 1;
        }
        Ok(Self { config, strategy })
    }

    /// The effective configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// The bound strategy.
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Number of negatives per row for a scene with `neighbours` neighbours.
    pub fn negatives_per_row(&self, neighbours: usize) -> usize {
        match self.strategy {
            SamplingStrategy::Local => LOCAL_CANDIDATES_PER_BOUNDARY * self.config.num_boundary,
            SamplingStrategy::Event => (self.config.num_boundary + ZONE_COUNT) * neighbours,
        }
    }

    /// Draw samples for one scene.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        robot: ArrayView2<'_, f32>,
        neighbor_mask: ArrayView2<'_, bool>,
        pos_seeds: ArrayView3<'_, f32>,
        neg_seeds: ArrayView4<'_, f32>,
        rng: &mut R,
    ) -> Result<ContrastSamples, SamplerError> {
        let (n, h, m, _) = neg_seeds.dim();
        if robot.dim() != (n, 2) {
            return Err(shape("robot", &[n, 2], robot.shape()));
        }
        if neighbor_mask.dim() != (n, m) {
            return Err(shape("neighbor mask", &[n, m], neighbor_mask.shape()));
        }
        if h == 0 {
            return Err(CoreError::FrameOutOfRange { what: "contrast horizon", index: 0, len: 0 }.into());
        }

        let seed_valid = {
            let mut valid = valid_pairs(
                pos_seeds,
                neg_seeds,
                self.config.min_separation,
                self.config.max_separation,
            )?;
            valid &= &neighbor_mask.insert_axis(Axis(1));
            valid
        };

        let samples = match self.strategy {
            SamplingStrategy::Local => self.local(robot, &seed_valid, pos_seeds, rng),
            SamplingStrategy::Event => self.event(robot, &seed_valid, pos_seeds, neg_seeds, rng),
        };
        tracing::trace!(
            strategy = %self.strategy,
            agents = n,
            negatives = samples.num_negatives(),
            valid = samples.valid.iter().filter(|&&v| v).count(),
            "drew contrast samples"
        );
        Ok(samples)
    }

    fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        (rng.random::<f32>() - 0.5) * self.config.noise_local
    }

    fn local<R: Rng + ?Sized>(
        &self,
        robot: ArrayView2<'_, f32>,
        seed_valid: &Array3<bool>,
        pos_seeds: ArrayView3<'_, f32>,
        rng: &mut R,
    ) -> ContrastSamples {
        let cfg = &self.config;
        let n = robot.nrows();
        let count = LOCAL_CANDIDATES_PER_BOUNDARY * cfg.num_boundary;

        let mut positive = Array3::zeros((n, 1, 2));
        for i in 0..n {
            for c in 0..2 {
                positive[[i, 0, c]] = pos_seeds[[i, 0, c]] + self.jitter(rng) - robot[[i, c]];
            }
        }

        let mut negative = Array4::zeros((n, 1, count, 2));
        let mut valid = Array3::from_elem((n, 1, count), false);
        for i in 0..n {
            let has_neighbour = seed_valid.index_axis(Axis(0), i).row(0).iter().any(|&v| v);
            for j in 0..count {
                let radius = rng.random::<f32>() * cfg.max_range + cfg.min_separation;
                let theta = rng.random::<f32>() * 2.0 * PI;
                let (sin, cos) = theta.sin_cos();
                // Diagonal mapping kept for compatibility with trained models.
                let offset = [radius * cos + radius * sin, radius * sin - radius * cos];

                let mut dist2 = 0.0;
                for c in 0..2 {
                    let point = pos_seeds[[i, 0, c]] + offset[c] + self.jitter(rng);
                    negative[[i, 0, j, c]] = point - robot[[i, c]];
                    let d = negative[[i, 0, j, c]] - positive[[i, 0, c]];
                    dist2 += d * d;
                }
                let dist = f32::sqrt(dist2);
                valid[[i, 0, j]] =
                    has_neighbour && dist > cfg.min_separation && dist < cfg.max_separation;
            }
        }

        ContrastSamples { positive, negative, valid }
    }

    fn event<R: Rng + ?Sized>(
        &self,
        robot: ArrayView2<'_, f32>,
        seed_valid: &Array3<bool>,
        pos_seeds: ArrayView3<'_, f32>,
        neg_seeds: ArrayView4<'_, f32>,
        rng: &mut R,
    ) -> ContrastSamples {
        let (n, h, m, _) = neg_seeds.dim();
        let ratios = self.config.boundary_ratios();
        let zones = self.config.zone_offsets();
        let boundary_len = ratios.len() * m;
        let total = boundary_len + ZONE_COUNT * m;

        let mut negative = Array4::zeros((n, h, total, 2));
        let mut valid = Array3::from_elem((n, h, total), false);
        for i in 0..n {
            for t in 0..h {
                let pos = [pos_seeds[[i, t, 0]], pos_seeds[[i, t, 1]]];
                for j in 0..m {
                    let neg = [neg_seeds[[i, t, j, 0]], neg_seeds[[i, t, j, 1]]];
                    let ok = seed_valid[[i, t, j]];

                    // [boundary(ratio-major)..., territory(neighbour-major)...]
                    for (a, &alpha) in ratios.iter().enumerate() {
                        let slot = a * m + j;
                        for c in 0..2 {
                            negative[[i, t, slot, c]] = neg[c] * alpha + pos[c] * (1.0 - alpha);
                        }
                        valid[[i, t, slot]] = ok;
                    }
                    for (z, offset) in zones.iter().enumerate() {
                        let slot = boundary_len + j * ZONE_COUNT + z;
                        for c in 0..2 {
                            negative[[i, t, slot, c]] = neg[c] + offset[c];
                        }
                        valid[[i, t, slot]] = ok;
                    }
                }
            }
        }

        let mut positive = pos_seeds.to_owned();
        for ((i, _, c), v) in positive.indexed_iter_mut() {
            *v += self.jitter(rng) - robot[[i, c]];
        }
        for ((i, _, _, c), v) in negative.indexed_iter_mut() {
            *v += self.jitter(rng) - robot[[i, c]];
        }

        ContrastSamples { positive, negative, valid }
    }
}

fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> SamplerError {
    CoreError::ShapeMismatch {
        what,
        expected: expected.to_vec(),
        actual: actual.to_vec(),
    }
    .into()
}
