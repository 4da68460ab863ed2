//! Stable identifier for a vector stored in a [`crate::store::VectorStore`].
//!
//! Mirrors the `NodeId` / `INVALID_NODE_ID` sentinel idiom used throughout the
//! index arenas: the id is biased by one internally so that the all-zero value
//! is free to mean "invalid" without stealing a real slot.

use std::fmt;

use crate::error::BallastError;

/// Identifier for a vector held by a [`crate::store::VectorStore`].
///
/// External code always sees the unbiased index (`0` is a perfectly normal
/// first vector); internally the id is stored as `index + 1` so that `0`
/// remains free as the "invalid" sentinel, matching the arena handle
/// convention used by the tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VectorId(u64);

impl VectorId {
    /// Sentinel denoting "no vector".
    pub const INVALID: VectorId = VectorId(0);

    /// Wrap an external, unbiased index.
    #[must_use]
    pub fn new(index: u64) -> Self {
        VectorId(index + 1)
    }

    /// Unwrap back to the external, unbiased index.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidId`] if called on [`VectorId::INVALID`].
    pub fn index(self) -> Result<u64, BallastError> {
        self.0
            .checked_sub(1)
            .ok_or(BallastError::InvalidId { id: 0 })
    }

    /// True if this is the invalid sentinel.
    #[must_use]
    pub fn is_invalid(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Ok(i) => write!(f, "V{i}"),
            Err(_) => write!(f, "V<invalid>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bias() {
        let id = VectorId::new(41);
        assert_eq!(id.index().unwrap(), 41);
    }

    #[test]
    fn zero_is_a_valid_external_index() {
        let id = VectorId::new(0);
        assert!(!id.is_invalid());
        assert_eq!(id.index().unwrap(), 0);
    }

    #[test]
    fn invalid_sentinel_reports_invalid_id() {
        assert!(VectorId::INVALID.is_invalid());
        assert!(VectorId::INVALID.index().is_err());
    }

    #[test]
    fn display_formats_as_v_prefixed_index() {
        assert_eq!(VectorId::new(7).to_string(), "V7");
        assert_eq!(VectorId::INVALID.to_string(), "V<invalid>");
    }
}
