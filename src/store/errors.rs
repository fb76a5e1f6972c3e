//! # Store Errors
//!
//! Failure taxonomy for store operations:
//!
//! - Schema errors and identity collisions are fatal: they indicate a
//!   misconfigured store or malformed input, and callers should surface
//!   them immediately.
//! - Medium failures propagate unchanged; the engine adds no retry.
//! - A rejected optimistic-concurrency check is *not* an error; point
//!   updates return [`crate::store::UpdateOutcome::Rejected`] so the caller
//!   can re-fetch and retry.
//! - Zero-length operand sets are no-op successes, never errors.

use crate::grid::MediumError;
use crate::schema::SchemaError;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by [`crate::store::TableStore`] operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Schema resolution or validation failed (fatal, construction time)
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The backing medium failed; propagated without retry
    #[error(transparent)]
    Medium(#[from] MediumError),

    /// Two records hash to the same key during grouping.
    ///
    /// Silently keeping either record would drop data, so grouping fails
    /// fast instead.
    #[error("identity collision in region '{region}': two records share the key '{key}'")]
    IdentityCollision {
        /// Region being grouped
        region: String,
        /// The colliding hash key
        key: String,
    },

    /// An operation referenced a field the schema does not declare
    #[error("unknown field '{field}' for region '{region}'")]
    UnknownField {
        /// The missing field name
        field: String,
        /// Region whose schema was consulted
        region: String,
    },

    /// A row address fell before the data region or past its end
    #[error("row {row} is outside the data region of '{region}'")]
    RowOutOfRange {
        /// The offending 1-based row
        row: u32,
        /// Region the operation targeted
        region: String,
    },

    /// A row-bearing operation received a record with no persisted row
    #[error("record carries no persisted row (candidate records cannot be updated or deleted)")]
    MissingRow,
}
