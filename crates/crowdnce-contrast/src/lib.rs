//! Social contrastive loss.
//!
//! [`SocialNce`] samples positive and negative events around every agent,
//! embeds them with a sample encoder, embeds the predictor's per-agent
//! features with a projection head, and scores the positive against the
//! valid negatives with a temperature-scaled InfoNCE objective.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod nce;

pub use config::{ContrastConfig, ContrastLossKind};
pub use error::ContrastError;
pub use nce::SocialNce;
