//! Error taxonomy shared by both index structures.

use thiserror::Error;

/// Everything that can go wrong calling into a vector store or index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BallastError {
    /// A caller-supplied argument was out of range or otherwise nonsensical.
    #[error("invalid argument: {detail}")]
    InvalidArgument {
        /// Human-readable description of what was wrong.
        detail: String,
    },

    /// Two vectors (or a vector and the store/metric) disagreed on dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the caller's context required.
        expected: usize,
        /// The dimension actually observed.
        actual: usize,
    },

    /// A `VectorId` was the invalid sentinel or outside the store's range.
    #[error("invalid vector id: {id}")]
    InvalidId {
        /// The offending id, in its external (unbiased) form.
        id: u64,
    },
}

impl BallastError {
    /// Build an [`BallastError::InvalidArgument`] from a `Display`-able detail.
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        BallastError::InvalidArgument {
            detail: detail.into(),
        }
    }
}
