//! Sampler errors.

use crowdnce_core::CoreError;
use thiserror::Error;

/// Errors raised while configuring or running an [`EventSampler`](crate::EventSampler).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SamplerError {
    /// A configuration field failed validation.
    #[error("invalid sampler config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
    /// The sampling strategy tag is not known.
    #[error("sampling strategy '{name}' is not implemented")]
    UnknownStrategy {
        /// The rejected tag.
        name: String,
    },
    /// Seed or mask arrays had inconsistent shapes.
    #[error(transparent)]
    Core(#[from] CoreError),
}
