//! gridstore - A contiguity-aware tabular record store
//!
//! Treats named regions of a grid medium as lightweight record tables:
//! frozen column schemas, cached materialization, run-batched bulk
//! mutations, and three-way merge reconciliation.

pub mod grid;
pub mod observability;
pub mod record;
pub mod schema;
pub mod store;
