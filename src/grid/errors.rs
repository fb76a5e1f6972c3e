//! # Medium Errors
//!
//! Failures reported by the backing grid medium. The engine propagates
//! these unchanged: retry policy (backoff, attempt limits) belongs to the
//! medium's own client, never to this crate.

use thiserror::Error;

/// Result type for grid-medium operations
pub type MediumResult<T> = Result<T, MediumError>;

/// Errors surfaced by a [`crate::grid::GridRegion`] implementation
#[derive(Debug, Clone, Error)]
pub enum MediumError {
    /// An address fell outside the region's current bounds
    #[error("address out of bounds: row {row}, col {col} (region is {rows}x{cols})")]
    OutOfBounds {
        /// Requested 1-based row
        row: u32,
        /// Requested 1-based column
        col: u32,
        /// Current row capacity
        rows: u32,
        /// Current column capacity
        cols: u32,
    },

    /// The named region does not exist on the medium
    #[error("region not found: '{0}'")]
    RegionNotFound(String),

    /// Any other failure from the hosting medium, passed through verbatim
    #[error("medium failure: {0}")]
    Backend(String),
}
