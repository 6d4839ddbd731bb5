//! crowdnce: social contrastive learning for multi-agent pedestrian
//! trajectory prediction.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all crowdnce sub-crates. For most users, adding `crowdnce` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use crowdnce::prelude::*;
//!
//! let config = SessionConfig {
//!     dataset: "zara1".into(),
//!     ..SessionConfig::default()
//! };
//! config.validate().unwrap();
//!
//! let sampler = EventSampler::new(
//!     config.train.contrast.sampler.clone(),
//!     config.train.contrast.sampling,
//! )
//! .unwrap();
//! assert_eq!(sampler.strategy(), SamplingStrategy::Event);
//! assert_eq!("zara1".parse::<Dataset>().unwrap().targets().fde, 0.524);
//! ```
//!
//! A predictor plugs in through [`model::TrajectoryPredictor`]; hand a
//! constructor to [`train::Trainer::build`] and drive epochs with
//! [`train::Session`].
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `crowdnce-core` | Scene batches, geometry, bivariate Gaussian |
//! | [`sampler`] | `crowdnce-sampler` | Local and event contrastive sampling |
//! | [`model`] | `crowdnce-model` | Predictor trait, encoders, task loss |
//! | [`contrast`] | `crowdnce-contrast` | Social contrastive loss |
//! | [`metrics`] | `crowdnce-metrics` | ADE/FDE, collision curves, worker pool |
//! | [`train`] | `crowdnce-train` | Trainer, rollout, evaluation, checkpoints |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Scene batches, pairwise geometry and the bivariate Gaussian
/// (`crowdnce-core`).
pub use crowdnce_core as types;

/// Contrastive sample generation (`crowdnce-sampler`).
///
/// [`sampler::EventSampler`] is configured once from a
/// [`sampler::SamplerConfig`] and a [`sampler::SamplingStrategy`].
pub use crowdnce_sampler as sampler;

/// Differentiable building blocks (`crowdnce-model`).
///
/// The [`model::TrajectoryPredictor`] trait is the main extension point.
pub use crowdnce_model as model;

/// Social contrastive loss (`crowdnce-contrast`).
pub use crowdnce_contrast as contrast;

/// Evaluation metrics and the per-scene worker pool (`crowdnce-metrics`).
pub use crowdnce_metrics as metrics;

/// Training loop, rollout, evaluation and checkpointing
/// (`crowdnce-train`).
pub use crowdnce_train as train;

/// Common imports for typical crowdnce usage.
///
/// ```rust
/// use crowdnce::prelude::*;
/// ```
pub mod prelude {
    // Scenes
    pub use crowdnce_core::{negative_seeds, positive_seeds, Bivariate, SceneBatch};

    // Sampling
    pub use crowdnce_sampler::{EventSampler, SamplerConfig, SamplingStrategy};

    // Model
    pub use crowdnce_model::{PredictorOutput, ProjectionHead, SampleEncoder, TrajectoryPredictor};

    // Contrast
    pub use crowdnce_contrast::{ContrastConfig, ContrastLossKind, SocialNce};

    // Metrics
    pub use crowdnce_metrics::{EvalSummary, MetricsPool, PoolConfig};

    // Training
    pub use crowdnce_train::{
        init_tracing, Dataset, EvalReport, Evaluator, RolloutMode, Session, SessionConfig,
        TrainConfig, Trainer,
    };

    // Errors
    pub use crowdnce_contrast::ContrastError;
    pub use crowdnce_core::CoreError;
    pub use crowdnce_metrics::MetricsError;
    pub use crowdnce_sampler::SamplerError;
    pub use crowdnce_train::TrainError;
}
