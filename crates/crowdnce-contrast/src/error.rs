//! Contrastive loss errors.

use crowdnce_core::CoreError;
use crowdnce_sampler::SamplerError;
use thiserror::Error;

/// Errors from configuring or evaluating the contrastive loss.
#[derive(Debug, Error)]
pub enum ContrastError {
    /// Sampling failed or the sampler config was rejected.
    #[error(transparent)]
    Sampler(#[from] SamplerError),
    /// Tensor arithmetic failed.
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
    /// The loss tag is not known.
    #[error("contrastive loss '{name}' is not implemented")]
    UnknownLoss {
        /// The rejected tag.
        name: String,
    },
    /// Query and key embeddings have different widths.
    #[error("projection head emits {query} dims but the sample encoder emits {key}")]
    EmbeddingMismatch {
        /// Width of the projection head output.
        query: usize,
        /// Width of the sample encoder output.
        key: usize,
    },
    /// A configuration field failed validation.
    #[error("invalid contrast config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}

impl From<CoreError> for ContrastError {
    fn from(err: CoreError) -> Self {
        Self::Sampler(SamplerError::Core(err))
    }
}
