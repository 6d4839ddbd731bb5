//! Training and evaluation harness.
//!
//! A [`Session`] drives epochs: [`Trainer`] fits the predictor with the
//! bivariate task loss plus the weighted social contrastive loss,
//! [`Evaluator`] rolls out K samples on validation and test scenes and
//! scores them on the metrics pool, and the epoch record is appended to
//! the [`TrainingLog`] before checkpoints are written and the best epoch is
//! promoted.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod log;
pub mod rollout;
pub mod selection;
pub mod session;
pub mod telemetry;
pub mod trainer;

pub use checkpoint::{CheckpointStore, ConstantMetrics, TrainingMetrics};
pub use config::{SessionConfig, TrainConfig};
pub use error::TrainError;
pub use evaluate::{EvalReport, Evaluator};
pub use log::{EpochRecord, TrainingLog};
pub use rollout::{best_of_k_step, one_shot_params, oracle_decode, to_absolute, RolloutMode};
pub use selection::{pick_best_epoch, Dataset, Targets};
pub use session::{EpochOutcome, RunningBests, Session};
pub use telemetry::init_tracing;
pub use trainer::{BatchLosses, EpochLosses, Trainer};
