//! Differentiable building blocks for crowdnce.
//!
//! The trajectory predictor itself is an external collaborator, described
//! by [`TrajectoryPredictor`]. This crate also provides the small MLPs used
//! by the contrastive objective ([`SpatialEncoder`], [`EventEncoder`],
//! [`ProjHead`]), the bivariate negative log-likelihood task loss, and a
//! thin bridge between `ndarray` arrays and `candle` tensors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod encoder;
pub mod loss;
pub mod predictor;

pub use bridge::{array2_from_tensor, array3_from_tensor, mask_tensor, tensor_from_array};
pub use encoder::{EventEncoder, ProjHead, ProjectionHead, SampleEncoder, SpatialEncoder};
pub use loss::bivariate_nll;
pub use predictor::{PredictorOutput, TrajectoryPredictor};
