//! Mutation operations
//!
//! Every operation here follows the same discipline: validate against the
//! frozen schema, issue the minimal sequence of medium calls (one per
//! contiguous row run for bulk work), re-assert column formats, invalidate
//! the record cache, and emit one structured log event. A zero-length
//! operand set is a no-op success and never touches the medium.

use std::collections::HashMap;

use super::contiguity::contiguous_runs;
use super::errors::{StoreError, StoreResult};
use super::TableStore;
use crate::observability::{Logger, Severity};
use crate::record::{CellValue, Record};

/// Where a bulk insert places its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// After the last used row, growing the region if capacity runs out
    Append,
    /// At the first data row, shifting existing rows down first
    Prepend,
}

/// Result of an optimistic-concurrency point update.
///
/// A rejected update is a recoverable condition, not an error: the caller
/// is expected to re-fetch the row and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Control fields matched; the row was written
    Applied,
    /// A control field no longer matched; the medium was not written
    Rejected,
}

impl UpdateOutcome {
    /// True iff the update reached the medium
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

impl TableStore {
    /// Bulk-insert candidate records as one rectangular write.
    ///
    /// Fields a record leaves unset take the store's configured default
    /// value. Appending grows the region when the target range would exceed
    /// capacity; prepending shifts existing data rows down first. Returns
    /// the number of rows written.
    pub fn insert(&mut self, records: &[Record], position: InsertPosition) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let n = records.len() as u32;
        let first = self.schema().data_row_first();
        let start = match position {
            InsertPosition::Prepend => {
                self.region().insert_rows_before(first, n)?;
                first
            }
            InsertPosition::Append => {
                let start = self.last_used_row()? + 1;
                let capacity = self.region().row_count()?;
                let end = start + n - 1;
                if end > capacity {
                    self.region().append_rows_after(capacity, end - capacity)?;
                }
                start
            }
        };

        let fill = self.default_value().clone();
        let block: Vec<Vec<CellValue>> = records
            .iter()
            .map(|record| self.record_to_row(record, &fill))
            .collect();
        self.region()
            .write(start, self.schema().data_column_first(), &block)?;

        self.finish_mutation("store.insert", records.len())?;
        Ok(records.len())
    }

    /// Point update with an optional optimistic-concurrency guard.
    ///
    /// Reads the row directly (never from the cache), compares each
    /// `control_keys` field of the live row against `patch`, and refuses
    /// the write on any mismatch. Only fields explicitly present in `patch`
    /// are overwritten; everything else on the row is preserved.
    pub fn update_row(
        &mut self,
        row: u32,
        patch: &Record,
        control_keys: &[String],
    ) -> StoreResult<UpdateOutcome> {
        self.require_fields(control_keys)?;
        let patch_fields: Vec<String> = patch.fields().map(|(name, _)| name.to_string()).collect();
        self.require_fields(&patch_fields)?;

        let mut current = self.record_at(row)?;
        for key in control_keys {
            if current.value(key) != patch.value(key) {
                Logger::log(
                    Severity::Warn,
                    "store.update_row",
                    &[
                        ("region", self.region_name()),
                        ("row", &row.to_string()),
                        ("outcome", "rejected"),
                        ("control_key", key),
                    ],
                );
                return Ok(UpdateOutcome::Rejected);
            }
        }

        for (name, value) in patch.fields() {
            current.set(name, value.clone());
        }
        let cells = self.record_to_row(&current, &CellValue::Empty);
        self.region()
            .write(row, self.schema().data_column_first(), &[cells])?;

        self.finish_mutation("store.update_row", 1)?;
        Ok(UpdateOutcome::Applied)
    }

    /// Bulk update of previously materialized records the caller mutated in
    /// place. Rows are partitioned into contiguous runs and each run is
    /// written with a single medium call.
    pub fn update_records(&mut self, records: &[Record]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut by_row: HashMap<u32, &Record> = HashMap::with_capacity(records.len());
        for record in records {
            let row = record.row().ok_or(StoreError::MissingRow)?;
            by_row.insert(row, record);
        }
        let rows: Vec<u32> = by_row.keys().copied().collect();

        for run in contiguous_runs(&rows) {
            let block: Vec<Vec<CellValue>> = (run.first..=run.last)
                .map(|row| self.record_to_row(by_row[&row], &CellValue::Empty))
                .collect();
            self.region()
                .write(run.first, self.schema().data_column_first(), &block)?;
        }

        self.finish_mutation("store.update", by_row.len())?;
        Ok(by_row.len())
    }

    /// Bulk delete of row-bearing records.
    ///
    /// Rows are partitioned into contiguous runs and runs are deleted from
    /// the highest row number down, so an earlier deletion never shifts the
    /// rows of a run not yet processed.
    pub fn delete_records(&mut self, records: &[Record]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            rows.push(record.row().ok_or(StoreError::MissingRow)?);
        }

        let runs = contiguous_runs(&rows);
        let mut deleted = 0u32;
        for run in runs.iter().rev() {
            self.region().delete_rows(run.first, run.len())?;
            deleted += run.len();
        }

        self.finish_mutation("store.delete", deleted as usize)?;
        Ok(deleted as usize)
    }

    /// Replace the whole data region with `records`: resize to exactly the
    /// incoming count, then write everything as one block.
    ///
    /// An empty record set is a no-op (zero-length operands never touch the
    /// medium); callers that want to clear a region delete its records.
    pub fn replace_all(&mut self, records: &[Record]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let first = self.schema().data_row_first();
        let n = records.len() as u32;
        let total = self.region().row_count()?;
        let required = first - 1 + n;
        if required > total {
            self.region().append_rows_after(total, required - total)?;
        } else if required < total {
            self.region().delete_rows(first + n, total - required)?;
        }

        let fill = self.default_value().clone();
        let block: Vec<Vec<CellValue>> = records
            .iter()
            .map(|record| self.record_to_row(record, &fill))
            .collect();
        self.region()
            .write(first, self.schema().data_column_first(), &block)?;

        self.finish_mutation("store.replace", records.len())?;
        Ok(records.len())
    }

    /// Write the schema's field names to the header row, but only when every
    /// header cell is currently blank. Returns whether a write happened.
    ///
    /// Lets a caller bind a store to a freshly created region and seed its
    /// header before the first insert, without ever clobbering an existing
    /// header.
    pub fn ensure_header(&mut self) -> StoreResult<bool> {
        let Some(keys_row) = self.schema().keys_row() else {
            return Ok(false);
        };

        let width = self.schema().width();
        let col = self.schema().data_column_first();
        let header = self.region().read(keys_row, col, 1, width)?;
        let blank = header
            .first()
            .map(|cells| cells.iter().all(|c| c.display_string().trim().is_empty()))
            .unwrap_or(true);
        if !blank {
            return Ok(false);
        }

        let total = self.region().row_count()?;
        if keys_row > total {
            self.region().append_rows_after(total, keys_row - total)?;
        }
        let mut cells = vec![CellValue::Text(String::new()); width as usize];
        for (name, offset) in self.schema().fields() {
            cells[offset as usize] = CellValue::Text(name.to_string());
        }
        self.region().write(keys_row, col, &[cells])?;

        Logger::log(
            Severity::Info,
            "store.ensure_header",
            &[("region", self.region_name())],
        );
        Ok(true)
    }

    /// Re-assert every declared column format over the full data column.
    ///
    /// Formats are column-wide properties; re-applying after each mutation
    /// keeps them correct even when row counts changed.
    fn apply_formats(&self) -> StoreResult<()> {
        if self.formats().is_empty() {
            return Ok(());
        }
        let first = self.schema().data_row_first();
        let total = self.region().row_count()?;
        if total < first {
            return Ok(());
        }
        let height = total - first + 1;
        for (field, pattern) in self.formats() {
            if let Some(col) = self.schema().column_of(field) {
                self.region().set_column_format(first, col, height, pattern)?;
            }
        }
        Ok(())
    }

    /// Close out a mutating call: formats, cache invalidation, one event.
    /// Runs before the operation returns so any subsequent read observes
    /// post-mutation state.
    fn finish_mutation(&mut self, event: &str, rows: usize) -> StoreResult<()> {
        self.apply_formats()?;
        self.invalidate();
        Logger::log(
            Severity::Info,
            event,
            &[
                ("region", self.region_name()),
                ("rows", &rows.to_string()),
            ],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridOp, GridRegion, InMemoryGrid};
    use crate::store::TableConfig;
    use std::sync::Arc;

    fn store_over(grid: &Arc<InMemoryGrid>) -> TableStore {
        TableStore::new(
            Arc::clone(grid) as Arc<dyn GridRegion>,
            "stock",
            TableConfig::default(),
        )
        .unwrap()
    }

    fn seeded_grid() -> Arc<InMemoryGrid> {
        Arc::new(InMemoryGrid::from_rows(
            vec![
                vec!["sku".into(), "qty".into()],
                vec!["A".into(), CellValue::Number(5.0)],
                vec!["B".into(), CellValue::Number(3.0)],
            ],
            2,
        ))
    }

    #[test]
    fn test_insert_append_writes_after_last_used_row() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        let inserted = store
            .insert(
                &[Record::from_fields([("sku", "C"), ("qty", "1")])],
                InsertPosition::Append,
            )
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(grid.cell(4, 1), CellValue::Text("C".into()));
    }

    #[test]
    fn test_insert_append_grows_capacity_when_needed() {
        let grid = seeded_grid();
        assert_eq!(grid.row_count().unwrap(), 3);
        let mut store = store_over(&grid);
        store
            .insert(
                &[
                    Record::from_fields([("sku", "C")]),
                    Record::from_fields([("sku", "D")]),
                ],
                InsertPosition::Append,
            )
            .unwrap();
        assert_eq!(grid.row_count().unwrap(), 5);
        assert_eq!(grid.cell(5, 1), CellValue::Text("D".into()));
    }

    #[test]
    fn test_insert_prepend_shifts_existing_rows_down() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        store
            .insert(
                &[Record::from_fields([("sku", "Z"), ("qty", "9")])],
                InsertPosition::Prepend,
            )
            .unwrap();
        assert_eq!(grid.cell(2, 1), CellValue::Text("Z".into()));
        assert_eq!(grid.cell(3, 1), CellValue::Text("A".into()));
        assert_eq!(grid.cell(4, 1), CellValue::Text("B".into()));
    }

    #[test]
    fn test_insert_fills_unset_fields_with_default() {
        let grid = seeded_grid();
        let mut config = TableConfig::default();
        config.default_value = CellValue::Number(0.0);
        let mut store = TableStore::new(
            Arc::clone(&grid) as Arc<dyn GridRegion>,
            "stock",
            config,
        )
        .unwrap();
        store
            .insert(&[Record::from_fields([("sku", "C")])], InsertPosition::Append)
            .unwrap();
        assert_eq!(grid.cell(4, 2), CellValue::Number(0.0));
    }

    #[test]
    fn test_insert_zero_records_is_a_noop() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        grid.clear_ops();
        assert_eq!(store.insert(&[], InsertPosition::Append).unwrap(), 0);
        assert!(grid.ops().is_empty(), "no-op must not call the medium");
    }

    #[test]
    fn test_update_row_overwrites_only_patch_fields() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        let outcome = store
            .update_row(2, &Record::from_fields([("qty", 7i64)]), &[])
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(grid.cell(2, 1), CellValue::Text("A".into()));
        assert_eq!(grid.cell(2, 2), CellValue::Number(7.0));
    }

    #[test]
    fn test_update_row_control_mismatch_rejects_without_writing() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        grid.clear_ops();
        let mut patch = Record::from_fields([("qty", 7i64)]);
        patch.set("sku", "STALE");
        let outcome = store
            .update_row(2, &patch, &["sku".to_string()])
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Rejected);
        assert_eq!(grid.cell(2, 2), CellValue::Number(5.0));
        assert!(
            !grid.ops().iter().any(|op| matches!(op, GridOp::Write(..))),
            "rejected update must not write"
        );
    }

    #[test]
    fn test_update_records_batches_contiguous_rows() {
        let grid = Arc::new(InMemoryGrid::from_rows(
            vec![
                vec!["sku".into(), "qty".into()],
                vec!["A".into(), CellValue::Number(1.0)],
                vec!["B".into(), CellValue::Number(2.0)],
                vec!["C".into(), CellValue::Number(3.0)],
            ],
            2,
        ));
        let mut store = store_over(&grid);
        let mut records = store.records().unwrap();
        for record in &mut records {
            record.set("qty", 9i64);
        }
        grid.clear_ops();
        store.update_records(&records).unwrap();
        let writes = grid
            .ops()
            .iter()
            .filter(|op| matches!(op, GridOp::Write(..)))
            .count();
        assert_eq!(writes, 1, "three contiguous rows must write once");
        assert_eq!(grid.cell(4, 2), CellValue::Number(9.0));
    }

    #[test]
    fn test_update_records_without_row_fails() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        let result = store.update_records(&[Record::from_fields([("sku", "X")])]);
        assert!(matches!(result, Err(StoreError::MissingRow)));
    }

    #[test]
    fn test_delete_records_processes_runs_top_down() {
        let grid = Arc::new(InMemoryGrid::from_rows(
            vec![
                vec!["sku".into()],
                vec!["A".into()],
                vec!["B".into()],
                vec!["C".into()],
                vec!["D".into()],
                vec!["E".into()],
            ],
            1,
        ));
        let mut store = store_over(&grid);
        // Delete rows 2,3 and 5; run (5) must go before run (2,3).
        let records = vec![
            Record::new().with_row(2),
            Record::new().with_row(3),
            Record::new().with_row(5),
        ];
        let deleted = store.delete_records(&records).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(grid.delete_calls(), vec![(5, 1), (2, 2)]);
        let survivors = store.records().unwrap();
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].value("sku"), &CellValue::Text("C".into()));
        assert_eq!(survivors[1].value("sku"), &CellValue::Text("E".into()));
    }

    #[test]
    fn test_replace_all_resizes_then_writes_once() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        let incoming = vec![
            Record::from_fields([("sku", "X"), ("qty", "1")]),
            Record::from_fields([("sku", "Y"), ("qty", "2")]),
            Record::from_fields([("sku", "Z"), ("qty", "3")]),
        ];
        store.replace_all(&incoming).unwrap();
        assert_eq!(grid.row_count().unwrap(), 4);
        assert_eq!(grid.cell(4, 1), CellValue::Text("Z".into()));
        let records = store.records().unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_replace_all_shrinks_oversized_region() {
        let grid = Arc::new(InMemoryGrid::from_rows(
            vec![
                vec!["sku".into()],
                vec!["A".into()],
                vec!["B".into()],
                vec!["C".into()],
            ],
            1,
        ));
        let mut store = store_over(&grid);
        store
            .replace_all(&[Record::from_fields([("sku", "only")])])
            .unwrap();
        assert_eq!(grid.row_count().unwrap(), 2);
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_formats_reasserted_after_mutation() {
        let grid = seeded_grid();
        let mut config = TableConfig::default();
        config.formats.insert("qty".into(), "0.00".into());
        let mut store = TableStore::new(
            Arc::clone(&grid) as Arc<dyn GridRegion>,
            "stock",
            config,
        )
        .unwrap();
        store
            .insert(&[Record::from_fields([("sku", "C")])], InsertPosition::Append)
            .unwrap();
        assert_eq!(grid.format_for(2).as_deref(), Some("0.00"));
    }

    #[test]
    fn test_cache_invalidated_before_mutation_returns() {
        let grid = seeded_grid();
        let mut store = store_over(&grid);
        assert_eq!(store.records().unwrap().len(), 2);
        store
            .insert(&[Record::from_fields([("sku", "C")])], InsertPosition::Append)
            .unwrap();
        assert_eq!(
            store.records().unwrap().len(),
            3,
            "read after mutation must observe post-mutation state"
        );
    }

    #[test]
    fn test_ensure_header_writes_only_when_blank() {
        let grid = Arc::new(InMemoryGrid::new(3, 2));
        let mut config = TableConfig::default();
        config.keys = crate::schema::KeySpec::Names(vec!["sku".into(), "qty".into()]);
        let mut store = TableStore::new(
            Arc::clone(&grid) as Arc<dyn GridRegion>,
            "stock",
            config,
        )
        .unwrap();

        assert!(store.ensure_header().unwrap());
        assert_eq!(grid.cell(1, 1), CellValue::Text("sku".into()));
        // Second call sees the freshly written header and leaves it alone.
        assert!(!store.ensure_header().unwrap());
    }
}
