//! Metrics errors.

use thiserror::Error;

/// Errors from per-scene evaluation, pooling and aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// A scene's arrays are inconsistent.
    #[error("scene {scene_index}: {reason}")]
    Scene {
        /// Position of the scene in the evaluation set.
        scene_index: usize,
        /// What was wrong.
        reason: String,
    },
    /// A scene's predictions or ground truth contain NaN or infinity.
    #[error("scene {scene_index}: non-finite trajectory values")]
    NonFinite {
        /// Position of the scene in the evaluation set.
        scene_index: usize,
    },
    /// A worker thread panicked; its results are lost.
    #[error("metrics worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker thread.
        worker: usize,
    },
    /// The OS refused to start a worker thread.
    #[error("failed to spawn metrics worker: {reason}")]
    ThreadSpawnFailed {
        /// The underlying I/O error.
        reason: String,
    },
    /// Nothing to aggregate.
    #[error("no agents to aggregate")]
    Empty,
    /// A raw collision curve does not split into whole groups.
    #[error("collision curve length {len} is not 1 + a multiple of {group}")]
    BinLayout {
        /// Curve length.
        len: usize,
        /// Required group size.
        group: usize,
    },
}
