//! Grid medium boundary
//!
//! The store engine never talks to the hosting medium directly; everything
//! goes through [`GridRegion`], a handle bound to one named rectangular
//! region. Implementations wrap whatever actually holds the cells (a hosted
//! spreadsheet, a local workbook, the in-memory reference grid).
//!
//! # Contract
//!
//! - Rows and columns are 1-based.
//! - Mutations are immediate and synchronous; nothing here retries or queues.
//! - `write` has full-overwrite semantics: no merge with prior content.
//! - Blocking, timeouts and cancellation are the medium client's concern;
//!   the engine treats every call as opaque and non-cancellable.

mod cache;
mod errors;
mod memory;

pub use cache::{RegionCache, RegionKey};
pub use errors::{MediumError, MediumResult};
pub use memory::{GridOp, InMemoryGrid};

use crate::record::CellValue;

/// Handle to one named rectangular region of a backing medium.
///
/// Methods take `&self`; implementations use interior mutability so a region
/// handle can be shared through the process-wide [`RegionCache`].
pub trait GridRegion: Send + Sync {
    /// Read a `height` x `width` block starting at (`row`, `col`)
    fn read(&self, row: u32, col: u32, height: u32, width: u32) -> MediumResult<Vec<Vec<CellValue>>>;

    /// Overwrite a block starting at (`row`, `col`) with `values`
    fn write(&self, row: u32, col: u32, values: &[Vec<CellValue>]) -> MediumResult<()>;

    /// Insert `count` blank rows immediately before `row`, shifting rows down
    fn insert_rows_before(&self, row: u32, count: u32) -> MediumResult<()>;

    /// Append `count` blank rows immediately after `row`, growing capacity
    fn append_rows_after(&self, row: u32, count: u32) -> MediumResult<()>;

    /// Delete `count` rows starting at `row`
    fn delete_rows(&self, row: u32, count: u32) -> MediumResult<()>;

    /// Current row capacity of the region
    fn row_count(&self) -> MediumResult<u32>;

    /// Current column capacity of the region
    fn column_count(&self) -> MediumResult<u32>;

    /// Assert a display format over `height` cells of one column.
    ///
    /// Formats are column-wide properties of the region; the store re-asserts
    /// them after every mutation so they stay correct when row counts change.
    fn set_column_format(&self, row: u32, col: u32, height: u32, pattern: &str) -> MediumResult<()>;
}
