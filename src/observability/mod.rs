//! Observability for store operations
//!
//! Structured, synchronous JSON logging. Metrics and tracing layers are out
//! of scope; every mutating store call still emits one structured event.

mod logger;

pub use logger::{Logger, Severity};
