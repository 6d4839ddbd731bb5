//! Error types shared by the array helpers in this crate.

use thiserror::Error;

/// Errors from shape-checked scene and geometry helpers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An input array did not have the expected shape.
    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the offending input.
        what: &'static str,
        /// Shape the caller was required to pass.
        expected: Vec<usize>,
        /// Shape that was actually passed.
        actual: Vec<usize>,
    },
    /// A frame or horizon index exceeds the frames available.
    #[error("{what}: index {index} out of range for {len} frames")]
    FrameOutOfRange {
        /// Name of the indexed quantity.
        what: &'static str,
        /// The requested index (or length).
        index: usize,
        /// Number of frames available.
        len: usize,
    },
    /// A scene must hold at least one agent.
    #[error("scene has no agents")]
    EmptyScene,
}

impl CoreError {
    pub(crate) fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
