//! Evaluation metrics for multi-agent trajectory prediction.
//!
//! Per scene, [`evaluate_scene`] computes best-of-K ADE/FDE, per-agent
//! collision frequency and the raw joint/cross/truth collision curves.
//! [`MetricsPool`] fans scenes out over named worker threads and returns
//! results in scene order; [`summarize`] pools them into an
//! [`EvalSummary`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod collision;
pub mod displacement;
pub mod error;
pub mod pool;
pub mod scene;
pub mod summary;

pub use aggregate::{post_process, CollisionCurves};
pub use collision::{collision_curve, interpolate, COLLISION_THRESHOLD, NUM_INTERP};
pub use displacement::{ade, best_of_k, fde};
pub use error::MetricsError;
pub use pool::{MetricsPool, PoolConfig};
pub use scene::{evaluate_scene, SceneMetrics, SceneRollout};
pub use summary::{summarize, EvalSummary, TruthCache};
