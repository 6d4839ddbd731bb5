//! Core types for the crowdnce workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! scene batch layout, the pairwise geometry used by contrastive sampling,
//! and the bivariate Gaussian that the predictor emits per agent per step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod gaussian;
pub mod geometry;
pub mod scene;

pub use error::CoreError;
pub use gaussian::{sample_trajectories, standard_normal_pair, Bivariate, PARAMS_PER_STEP};
pub use geometry::{euclidean, rel_to_abs, valid_pairs};
pub use scene::{negative_seeds, positive_seeds, remove_diagonal, SceneBatch};
