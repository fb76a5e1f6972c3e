//! Schema subsystem
//!
//! Discovers or accepts the field-name → column-offset mapping a store is
//! bound to, and freezes it for the store's lifetime.
//!
//! # Design Principles
//!
//! - Three input shapes (ordered names, explicit offsets, header discovery)
//!   normalize into one canonical [`FieldSchema`]; nothing downstream
//!   branches on the original shape.
//! - Resolution happens exactly once per store instance. Data caches are
//!   invalidated on every mutation; the schema never is.
//! - Validation errors are fatal and surface at construction, never later.

mod errors;
mod resolver;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use resolver::{resolve, KeySpec, RegionLayout};
pub use types::{column_letter, FieldSchema};
