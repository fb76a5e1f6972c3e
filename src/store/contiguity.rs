//! Contiguous-run partitioning
//!
//! The single performance-critical primitive of the store: every bulk
//! update/delete groups its rows into maximal runs of consecutive row
//! numbers and issues one medium call per run, bounding I/O to the number
//! of runs rather than the number of records. Each call against a hosted
//! medium carries fixed latency, so this is the difference between one
//! round-trip and hundreds.

/// A maximal run of consecutive 1-based row numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRun {
    /// First row of the run
    pub first: u32,
    /// Last row of the run (inclusive)
    pub last: u32,
}

impl RowRun {
    /// Number of rows covered by the run
    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    /// Runs always cover at least one row
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Partition `rows` into the minimal list of maximal contiguous runs,
/// ascending by row. Input order is irrelevant; duplicates collapse into
/// their run.
pub fn contiguous_runs(rows: &[u32]) -> Vec<RowRun> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut sorted = rows.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs = Vec::new();
    let mut current = RowRun {
        first: sorted[0],
        last: sorted[0],
    };
    for &row in &sorted[1..] {
        if row == current.last + 1 {
            current.last = row;
        } else {
            runs.push(current);
            current = RowRun { first: row, last: row };
        }
    }
    runs.push(current);
    runs
}
