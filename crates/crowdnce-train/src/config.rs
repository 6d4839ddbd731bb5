//! Training and session configuration.

use std::path::PathBuf;

use crowdnce_contrast::ContrastConfig;
use crowdnce_metrics::PoolConfig;
use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Parameters of the optimisation loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Contrastive objective parameters.
    pub contrast: ContrastConfig,
    /// Drop agents without a collision-free ground truth from the task loss,
    /// skipping batches where none remain. Default: false.
    pub safe_traj: bool,
    /// Global L2 gradient-norm bound; `None` disables clipping.
    pub clip_grad: Option<f64>,
    /// Samples drawn per scene at evaluation. Default: 20.
    pub k_samples: usize,
    /// Observed frame whose adjacency defines graph neighbours. Default: 1.
    pub adjacency_frame: usize,
    /// Observed frames per scene. Default: 8.
    pub obs_len: usize,
    /// Predicted frames per scene. Default: 12.
    pub pred_len: usize,
    /// AdamW learning rate. Default: 0.001.
    pub learning_rate: f64,
    /// Seed for the sampler and rollout RNG.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            contrast: ContrastConfig::default(),
            safe_traj: false,
            clip_grad: None,
            k_samples: 20,
            adjacency_frame: 1,
            obs_len: 8,
            pred_len: 12,
            learning_rate: 0.001,
            seed: 0,
        }
    }
}

impl TrainConfig {
    /// Check structural invariants.
    ///
    /// The contrastive horizon must fit in the prediction window and the
    /// adjacency frame in the observation window.
    pub fn validate(&self) -> Result<(), TrainError> {
        self.contrast.validate()?;
        if self.obs_len == 0 || self.pred_len < 2 {
            return Err(TrainError::Config {
                reason: format!(
                    "need obs_len >= 1 and pred_len >= 2, got {} and {}",
                    self.obs_len, self.pred_len
                ),
            });
        }
        if self.contrast.enabled() && self.contrast.horizon > self.pred_len {
            return Err(TrainError::Config {
                reason: format!(
                    "contrast horizon {} exceeds pred_len {}",
                    self.contrast.horizon, self.pred_len
                ),
            });
        }
        if self.adjacency_frame >= self.obs_len {
            return Err(TrainError::Config {
                reason: format!(
                    "adjacency_frame {} must be < obs_len {}",
                    self.adjacency_frame, self.obs_len
                ),
            });
        }
        if self.k_samples == 0 {
            return Err(TrainError::Config {
                reason: "k_samples must be at least 1".into(),
            });
        }
        if let Some(clip) = self.clip_grad {
            if !(clip.is_finite() && clip > 0.0) {
                return Err(TrainError::Config {
                    reason: format!("clip_grad must be positive, got {clip}"),
                });
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::Config {
                reason: format!("learning_rate must be positive, got {}", self.learning_rate),
            });
        }
        Ok(())
    }
}

/// Parameters of a full training session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dataset tag used to look up reference targets. Default: eth.
    pub dataset: String,
    /// Number of epochs. Default: 500.
    pub num_epochs: usize,
    /// Directory receiving the log, checkpoints and `args.json`.
    pub checkpoint_dir: PathBuf,
    /// Saved epochs required before best-epoch selection starts.
    pub min_epochs: usize,
    /// Slack added to the FDE target during selection. Default: 0.001.
    pub tolerance: f64,
    /// Amount subtracted from ADE/FDE targets for the epoch summary.
    /// Default: 0.05.
    pub margin: f64,
    /// Optimisation parameters.
    pub train: TrainConfig,
    /// Metrics worker pool.
    pub pool: PoolConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dataset: "eth".into(),
            num_epochs: 500,
            checkpoint_dir: PathBuf::from("checkpoint"),
            min_epochs: 0,
            tolerance: 0.001,
            margin: 0.05,
            train: TrainConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Check structural invariants, including the training config's.
    pub fn validate(&self) -> Result<(), TrainError> {
        self.train.validate()?;
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(TrainError::Config {
                reason: format!("tolerance must be >= 0, got {}", self.tolerance),
            });
        }
        if !self.margin.is_finite() {
            return Err(TrainError::Config {
                reason: format!("margin must be finite, got {}", self.margin),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
        let cfg = TrainConfig::default();
        assert_eq!(cfg.k_samples, 20);
        assert_eq!((cfg.obs_len, cfg.pred_len), (8, 12));
    }

    #[test]
    fn horizon_beyond_prediction_is_rejected() {
        let mut cfg = TrainConfig::default();
        cfg.contrast.horizon = 13;
        assert!(matches!(cfg.validate(), Err(TrainError::Config { .. })));
        cfg.contrast.weight = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn adjacency_frame_must_be_observed() {
        let cfg = TrainConfig {
            adjacency_frame: 8,
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_clip() {
        let cfg = TrainConfig {
            clip_grad: Some(0.0),
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SessionConfig =
            serde_json::from_str(r#"{"dataset":"zara1","train":{"safe_traj":true}}"#).unwrap();
        assert_eq!(cfg.dataset, "zara1");
        assert!(cfg.train.safe_traj);
        assert_eq!(cfg.num_epochs, 500);
        assert_eq!(cfg.train.k_samples, 20);
    }
}
