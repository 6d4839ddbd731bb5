//! Spatial sampling for the social contrastive objective.
//!
//! [`EventSampler`] turns positive seeds (where an agent actually goes) and
//! negative seeds (where its neighbours go) into jittered sample points,
//! re-centred on each agent's last observed position, plus a validity mask
//! over the negatives. Two strategies are available, resolved once from a
//! string tag via [`SamplingStrategy`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod sampler;
pub mod samples;
pub mod strategy;

pub use config::{SamplerConfig, ZONE_COUNT};
pub use error::SamplerError;
pub use sampler::EventSampler;
pub use samples::ContrastSamples;
pub use strategy::SamplingStrategy;
