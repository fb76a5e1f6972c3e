//! In-memory reference medium
//!
//! [`InMemoryGrid`] implements [`GridRegion`] over a plain vector of rows.
//! It exists for two reasons: it is the reference semantics for what a real
//! medium binding must do, and it records every call it receives so tests
//! can assert on I/O shape (how many `delete_rows` calls a bulk delete
//! issued, which blocks were written, which formats were re-asserted).
//!
//! Reads are total: cells outside the current bounds read as `Empty`, the
//! way a hosted spreadsheet returns blanks past its used range. Mutations
//! are bounds-checked.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{GridRegion, MediumError, MediumResult};
use crate::record::CellValue;

/// One recorded medium call (arguments only, 1-based addresses).
#[derive(Debug, Clone, PartialEq)]
pub enum GridOp {
    /// `read(row, col, height, width)`
    Read(u32, u32, u32, u32),
    /// `write(row, col)` of a `height` x `width` block
    Write(u32, u32, u32, u32),
    /// `insert_rows_before(row, count)`
    InsertRowsBefore(u32, u32),
    /// `append_rows_after(row, count)`
    AppendRowsAfter(u32, u32),
    /// `delete_rows(row, count)`
    DeleteRows(u32, u32),
    /// `set_column_format(row, col, height, pattern)`
    SetColumnFormat(u32, u32, u32, String),
}

struct GridState {
    rows: Vec<Vec<CellValue>>,
    cols: u32,
    formats: HashMap<u32, String>,
}

/// Reference [`GridRegion`] backed by process memory, with a call log.
pub struct InMemoryGrid {
    state: Mutex<GridState>,
    log: Mutex<Vec<GridOp>>,
}

impl InMemoryGrid {
    /// Create a blank grid with the given capacity
    pub fn new(rows: u32, cols: u32) -> Self {
        let blank = vec![vec![CellValue::Empty; cols as usize]; rows as usize];
        Self {
            state: Mutex::new(GridState {
                rows: blank,
                cols,
                formats: HashMap::new(),
            }),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Create a grid pre-seeded with `rows`, padded to a uniform width
    pub fn from_rows(rows: Vec<Vec<CellValue>>, cols: u32) -> Self {
        let grid = Self::new(0, cols);
        {
            let mut state = grid.state.lock().expect("grid poisoned");
            for mut row in rows {
                row.resize(cols as usize, CellValue::Empty);
                state.rows.push(row);
            }
        }
        grid
    }

    /// Snapshot of every recorded call since construction or [`Self::clear_ops`]
    pub fn ops(&self) -> Vec<GridOp> {
        self.log.lock().expect("grid poisoned").clone()
    }

    /// Forget the recorded call history
    pub fn clear_ops(&self) {
        self.log.lock().expect("grid poisoned").clear();
    }

    /// The `(row, count)` arguments of every recorded `delete_rows` call
    pub fn delete_calls(&self) -> Vec<(u32, u32)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                GridOp::DeleteRows(row, count) => Some((row, count)),
                _ => None,
            })
            .collect()
    }

    /// The format pattern currently asserted on a 1-based column, if any
    pub fn format_for(&self, col: u32) -> Option<String> {
        self.state
            .lock()
            .expect("grid poisoned")
            .formats
            .get(&col)
            .cloned()
    }

    /// Read a single cell (test convenience, not part of the trait)
    pub fn cell(&self, row: u32, col: u32) -> CellValue {
        let state = self.state.lock().expect("grid poisoned");
        state
            .rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .cloned()
            .unwrap_or(CellValue::Empty)
    }

    fn record(&self, op: GridOp) {
        self.log.lock().expect("grid poisoned").push(op);
    }

    fn check_address(state: &GridState, row: u32, col: u32) -> MediumResult<()> {
        if row == 0 || col == 0 || row > state.rows.len() as u32 || col > state.cols {
            return Err(MediumError::OutOfBounds {
                row,
                col,
                rows: state.rows.len() as u32,
                cols: state.cols,
            });
        }
        Ok(())
    }
}

impl GridRegion for InMemoryGrid {
    fn read(&self, row: u32, col: u32, height: u32, width: u32) -> MediumResult<Vec<Vec<CellValue>>> {
        self.record(GridOp::Read(row, col, height, width));
        let state = self.state.lock().expect("grid poisoned");
        let mut block = Vec::with_capacity(height as usize);
        for r in 0..height {
            let row_idx = (row + r) as usize - 1;
            let mut out = Vec::with_capacity(width as usize);
            for c in 0..width {
                let col_idx = (col + c) as usize - 1;
                let value = state
                    .rows
                    .get(row_idx)
                    .and_then(|cells| cells.get(col_idx))
                    .cloned()
                    .unwrap_or(CellValue::Empty);
                out.push(value);
            }
            block.push(out);
        }
        Ok(block)
    }

    fn write(&self, row: u32, col: u32, values: &[Vec<CellValue>]) -> MediumResult<()> {
        let height = values.len() as u32;
        let width = values.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        self.record(GridOp::Write(row, col, height, width));
        if height == 0 {
            return Ok(());
        }

        let mut state = self.state.lock().expect("grid poisoned");
        Self::check_address(&state, row, col)?;
        Self::check_address(&state, row + height - 1, col + width.max(1) - 1)?;
        for (r, incoming) in values.iter().enumerate() {
            let target = &mut state.rows[row as usize - 1 + r];
            for (c, value) in incoming.iter().enumerate() {
                target[col as usize - 1 + c] = value.clone();
            }
        }
        Ok(())
    }

    fn insert_rows_before(&self, row: u32, count: u32) -> MediumResult<()> {
        self.record(GridOp::InsertRowsBefore(row, count));
        let mut state = self.state.lock().expect("grid poisoned");
        let len = state.rows.len() as u32;
        if row == 0 || row > len + 1 {
            return Err(MediumError::OutOfBounds {
                row,
                col: 1,
                rows: len,
                cols: state.cols,
            });
        }
        let blank = vec![CellValue::Empty; state.cols as usize];
        let at = row as usize - 1;
        for _ in 0..count {
            state.rows.insert(at, blank.clone());
        }
        Ok(())
    }

    fn append_rows_after(&self, row: u32, count: u32) -> MediumResult<()> {
        self.record(GridOp::AppendRowsAfter(row, count));
        let mut state = self.state.lock().expect("grid poisoned");
        let len = state.rows.len() as u32;
        if row > len {
            return Err(MediumError::OutOfBounds {
                row,
                col: 1,
                rows: len,
                cols: state.cols,
            });
        }
        let blank = vec![CellValue::Empty; state.cols as usize];
        let at = row as usize;
        for _ in 0..count {
            state.rows.insert(at, blank.clone());
        }
        Ok(())
    }

    fn delete_rows(&self, row: u32, count: u32) -> MediumResult<()> {
        self.record(GridOp::DeleteRows(row, count));
        let mut state = self.state.lock().expect("grid poisoned");
        let len = state.rows.len() as u32;
        if row == 0 || count == 0 || row + count - 1 > len {
            return Err(MediumError::OutOfBounds {
                row,
                col: 1,
                rows: len,
                cols: state.cols,
            });
        }
        let start = row as usize - 1;
        state.rows.drain(start..start + count as usize);
        Ok(())
    }

    fn row_count(&self) -> MediumResult<u32> {
        Ok(self.state.lock().expect("grid poisoned").rows.len() as u32)
    }

    fn column_count(&self) -> MediumResult<u32> {
        Ok(self.state.lock().expect("grid poisoned").cols)
    }

    fn set_column_format(&self, row: u32, col: u32, height: u32, pattern: &str) -> MediumResult<()> {
        self.record(GridOp::SetColumnFormat(row, col, height, pattern.to_string()));
        let mut state = self.state.lock().expect("grid poisoned");
        if col == 0 || col > state.cols {
            return Err(MediumError::OutOfBounds {
                row,
                col,
                rows: state.rows.len() as u32,
                cols: state.cols,
            });
        }
        state.formats.insert(col, pattern.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_is_total_past_bounds() {
        let grid = InMemoryGrid::new(2, 2);
        let block = grid.read(1, 1, 4, 4).unwrap();
        assert_eq!(block.len(), 4);
        assert!(block.iter().flatten().all(CellValue::is_empty));
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let grid = InMemoryGrid::new(3, 2);
        grid.write(2, 1, &[vec!["A".into(), CellValue::Number(5.0)]])
            .unwrap();
        assert_eq!(grid.cell(2, 1), CellValue::Text("A".into()));
        assert_eq!(grid.cell(2, 2), CellValue::Number(5.0));
    }

    #[test]
    fn test_write_out_of_bounds_fails() {
        let grid = InMemoryGrid::new(2, 2);
        let result = grid.write(3, 1, &[vec!["x".into()]]);
        assert!(matches!(result, Err(MediumError::OutOfBounds { .. })));
    }

    #[test]
    fn test_insert_rows_shifts_content_down() {
        let grid = InMemoryGrid::from_rows(vec![vec!["a".into()], vec!["b".into()]], 1);
        grid.insert_rows_before(2, 2).unwrap();
        assert_eq!(grid.row_count().unwrap(), 4);
        assert_eq!(grid.cell(1, 1), CellValue::Text("a".into()));
        assert_eq!(grid.cell(2, 1), CellValue::Empty);
        assert_eq!(grid.cell(4, 1), CellValue::Text("b".into()));
    }

    #[test]
    fn test_append_rows_grows_capacity() {
        let grid = InMemoryGrid::new(2, 1);
        grid.append_rows_after(2, 3).unwrap();
        assert_eq!(grid.row_count().unwrap(), 5);
    }

    #[test]
    fn test_delete_rows_removes_range() {
        let grid = InMemoryGrid::from_rows(
            vec![vec!["a".into()], vec!["b".into()], vec!["c".into()]],
            1,
        );
        grid.delete_rows(2, 1).unwrap();
        assert_eq!(grid.row_count().unwrap(), 2);
        assert_eq!(grid.cell(2, 1), CellValue::Text("c".into()));
    }

    #[test]
    fn test_call_log_records_mutations() {
        let grid = InMemoryGrid::new(5, 1);
        grid.delete_rows(2, 2).unwrap();
        grid.set_column_format(1, 1, 3, "0.00").unwrap();
        assert_eq!(grid.delete_calls(), vec![(2, 2)]);
        assert_eq!(grid.format_for(1).as_deref(), Some("0.00"));
    }
}
