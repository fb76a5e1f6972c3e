//! # Schema Errors
//!
//! Schema errors are fatal: they surface at store construction (or first
//! schema access) and are never retried. A misconfigured key specification
//! or a header row with nothing in it means the store cannot address its
//! region at all.

use crate::grid::MediumError;
use thiserror::Error;

/// Result type for schema resolution
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while resolving a field schema
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The same field name appears twice in a key list or header row
    #[error("duplicate field '{field}' in schema for region '{region}'")]
    DuplicateField {
        /// Offending field name
        field: String,
        /// Region the schema was resolved for
        region: String,
    },

    /// Two fields were mapped to the same column offset
    #[error("fields '{first}' and '{second}' share column offset {offset} in region '{region}'")]
    ColumnConflict {
        /// Field already holding the offset
        first: String,
        /// Field attempting to claim it
        second: String,
        /// The contested zero-based offset
        offset: u32,
        /// Region the schema was resolved for
        region: String,
    },

    /// Header-row discovery found no field names
    #[error("no schema found in region '{region}': header row {keys_row} has no named cells")]
    NoSchemaFound {
        /// Region the discovery ran against
        region: String,
        /// The 1-based header row that was read
        keys_row: u32,
    },

    /// Discovery requested but the store declares no header row
    #[error("region '{region}' declares no header row to discover a schema from")]
    NoHeaderRow {
        /// Region the discovery ran against
        region: String,
    },

    /// A key specification produced zero fields
    #[error("empty key specification for region '{region}'")]
    EmptyKeySpec {
        /// Region the schema was resolved for
        region: String,
    },

    /// A layout anchor violated the 1-based addressing contract
    #[error("invalid layout for region '{region}': {anchor} must be at least 1")]
    InvalidLayout {
        /// Region the layout was declared for
        region: String,
        /// Name of the offending anchor field
        anchor: &'static str,
    },

    /// The medium failed while reading the header row
    #[error(transparent)]
    Medium(#[from] MediumError),
}
