//! Training errors.

use crowdnce_contrast::ContrastError;
use crowdnce_core::CoreError;
use crowdnce_metrics::MetricsError;
use thiserror::Error;

/// Errors surfaced by training, evaluation and checkpointing.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Tensor arithmetic or autograd failed.
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
    /// The contrastive path failed.
    #[error(transparent)]
    Contrast(#[from] ContrastError),
    /// Scene metrics failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// A scene batch is malformed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// Reading or writing the log or checkpoints failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Metric dictionaries could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The training log could not be written or parsed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A configuration field failed validation.
    #[error("invalid training config: {reason}")]
    Config {
        /// What was wrong.
        reason: String,
    },
    /// The dataset has no reference targets.
    #[error("dataset '{name}' is not implemented")]
    UnknownDataset {
        /// The rejected name.
        name: String,
    },
    /// The predictor returned no embedding although one was requested.
    #[error("predictor returned no embedding for the contrastive loss")]
    MissingEmbedding,
    /// The tracing subscriber could not be installed.
    #[error("failed to initialise tracing: {reason}")]
    Telemetry {
        /// What was wrong.
        reason: String,
    },
}
