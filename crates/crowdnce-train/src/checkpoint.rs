//! Checkpoint directory layout.
//!
//! ```text
//! <root>/
//!   args.json                      session configuration
//!   training_log.csv               one row per epoch
//!   metrics.json                   ┐
//!   constant_metrics.json          ├ copies of the promoted epoch
//!   val_best.safetensors           ┘
//!   history/
//!     epoch007_metrics.json
//!     epoch007_constant_metrics.json
//!     epoch007_val_best.safetensors
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use candle_nn::VarMap;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::TrainError;

const METRICS: &str = "metrics.json";
const CONSTANT_METRICS: &str = "constant_metrics.json";
const WEIGHTS: &str = "val_best.safetensors";

/// Loss histories, one entry per epoch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Mean total training loss.
    pub train_loss: Vec<f64>,
    /// Mean task loss.
    pub task_loss: Vec<f64>,
    /// Mean contrastive loss.
    pub contrast_loss: Vec<f64>,
    /// Validation NLL.
    pub val_loss: Vec<f64>,
}

/// Best validation loss seen so far.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantMetrics {
    /// Epoch of the best validation loss, `-1` before the first epoch.
    pub min_val_epoch: i64,
    /// Best validation loss.
    pub min_val_loss: f64,
}

impl Default for ConstantMetrics {
    fn default() -> Self {
        Self {
            min_val_epoch: -1,
            min_val_loss: 1e16,
        }
    }
}

impl ConstantMetrics {
    /// Record a validation loss; returns whether it is a new best.
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> bool {
        if val_loss < self.min_val_loss {
            self.min_val_loss = val_loss;
            self.min_val_epoch = epoch as i64;
            true
        } else {
            false
        }
    }
}

/// Writes per-epoch snapshots and promotes the selected one.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Create `root` and its `history/` subdirectory.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, TrainError> {
        let root = root.into();
        fs::create_dir_all(root.join("history"))?;
        Ok(Self { root })
    }

    /// Checkpoint root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the CSV training log.
    pub fn log_path(&self) -> PathBuf {
        self.root.join("training_log.csv")
    }

    /// Location of the text log written by the tracing subscriber.
    pub fn trace_path(&self) -> PathBuf {
        self.root.join("train.log")
    }

    fn history(&self, epoch: usize, name: &str) -> PathBuf {
        self.root.join("history").join(format!("epoch{epoch:03}_{name}"))
    }

    /// Persist the session configuration as `args.json`.
    pub fn write_args(&self, config: &SessionConfig) -> Result<(), TrainError> {
        fs::write(self.root.join("args.json"), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Snapshot one epoch.
    pub fn save_epoch(
        &self,
        epoch: usize,
        metrics: &TrainingMetrics,
        constant: &ConstantMetrics,
        weights: &VarMap,
    ) -> Result<(), TrainError> {
        fs::write(self.history(epoch, METRICS), serde_json::to_string(metrics)?)?;
        fs::write(self.history(epoch, CONSTANT_METRICS), serde_json::to_string(constant)?)?;
        weights.save(self.history(epoch, WEIGHTS))?;
        Ok(())
    }

    /// Copy the snapshot of `epoch` to the top-level files.
    pub fn promote(&self, epoch: usize) -> Result<(), TrainError> {
        for name in [METRICS, CONSTANT_METRICS, WEIGHTS] {
            fs::copy(self.history(epoch, name), self.root.join(name))?;
        }
        tracing::debug!(epoch, "promoted checkpoint");
        Ok(())
    }

    /// Number of epochs with saved weights.
    pub fn weight_count(&self) -> Result<usize, TrainError> {
        let mut count = 0;
        for entry in fs::read_dir(self.root.join("history"))? {
            let name = entry?.file_name();
            if name.to_string_lossy().ends_with(WEIGHTS) {
                count += 1;
            }
        }
        Ok(count)
    }
}
