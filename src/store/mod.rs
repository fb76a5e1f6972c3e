//! Tabular record store
//!
//! [`TableStore`] treats one named region of a grid medium as a lightweight
//! database: typed records keyed by their physical row, bulk mutations that
//! batch I/O by contiguous row runs, and a three-way merge that reconciles
//! an incoming record set against the region in one pass.
//!
//! # Design Principles
//!
//! - The schema is resolved once at construction and never invalidated.
//! - The record cache is owned exclusively by the store instance and is
//!   invalidated synchronously before every mutating call returns.
//! - Every bulk mutation issues one medium call per contiguous row run.
//! - No internal concurrency: operations run to completion with at most one
//!   medium call in flight.
//!
//! # Limitation
//!
//! The engine assumes a single logical writer per region. Two writers
//! hitting the same region from different store instances or processes can
//! race on row alignment; no lease or lock guards against that.

mod contiguity;
mod errors;
mod merge;
mod mutate;

pub use contiguity::{contiguous_runs, RowRun};
pub use errors::{StoreError, StoreResult};
pub use merge::{DefaultMergePolicy, MergeContext, MergeOptions, MergeOutcome, MergePolicy};
pub use mutate::{InsertPosition, UpdateOutcome};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::grid::{GridRegion, MediumResult, RegionCache};
use crate::record::{CellValue, Record};
use crate::schema::{resolve, FieldSchema, KeySpec, RegionLayout};

/// Declarative binding of a store to a region.
///
/// Deserializable so bindings can live in configuration files; every field
/// has the conventional default (headers in row 1, data from row 2,
/// fields from column A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// How fields map to columns; defaults to header-row discovery
    #[serde(default)]
    pub keys: KeySpec,
    /// 1-based header row, `None` for regions without one
    #[serde(default = "default_keys_row")]
    pub keys_row: Option<u32>,
    /// 1-based first data row
    #[serde(default = "default_data_row_first")]
    pub data_row_first: u32,
    /// 1-based first field column
    #[serde(default = "default_data_column_first")]
    pub data_column_first: u32,
    /// Value written for fields a candidate record leaves unset
    #[serde(default)]
    pub default_value: CellValue,
    /// Display-format patterns per field, re-asserted after every mutation
    #[serde(default)]
    pub formats: HashMap<String, String>,
}

fn default_keys_row() -> Option<u32> {
    Some(1)
}

fn default_data_row_first() -> u32 {
    2
}

fn default_data_column_first() -> u32 {
    1
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            keys: KeySpec::Discover,
            keys_row: default_keys_row(),
            data_row_first: default_data_row_first(),
            data_column_first: default_data_column_first(),
            default_value: CellValue::Empty,
            formats: HashMap::new(),
        }
    }
}

pub(crate) struct Materialized {
    /// One record per data row, including blank rows
    pub records: Vec<Record>,
    /// Row-emptiness flags, parallel to `records`
    pub empty: Vec<bool>,
}

/// A record store bound to one named region of a grid medium.
pub struct TableStore {
    region: Arc<dyn GridRegion>,
    region_name: String,
    schema: FieldSchema,
    default_value: CellValue,
    /// `(field, pattern)` pairs in ascending column order
    formats: Vec<(String, String)>,
    cache: Option<Materialized>,
}

impl TableStore {
    /// Bind a store to `region`, resolving the schema immediately.
    ///
    /// Fails if the key specification is invalid, if header discovery finds
    /// no fields, or if a declared format names an unknown field.
    pub fn new(
        region: Arc<dyn GridRegion>,
        region_name: impl Into<String>,
        config: TableConfig,
    ) -> StoreResult<Self> {
        let region_name = region_name.into();
        let layout = RegionLayout {
            keys_row: config.keys_row,
            data_row_first: config.data_row_first,
            data_column_first: config.data_column_first,
        };
        let schema = resolve(&config.keys, layout, region.as_ref(), &region_name)?;

        let mut formats: Vec<(String, String)> = Vec::with_capacity(config.formats.len());
        for (field, pattern) in config.formats {
            if !schema.contains(&field) {
                return Err(StoreError::UnknownField {
                    field,
                    region: region_name,
                });
            }
            formats.push((field, pattern));
        }
        formats.sort_by_key(|(field, _)| schema.offset_of(field).unwrap_or(u32::MAX));

        Ok(Self {
            region,
            region_name,
            schema,
            default_value: config.default_value,
            formats,
            cache: None,
        })
    }

    /// Bind a store through a shared [`RegionCache`], opening the region
    /// handle at most once per `(medium_id, region_name)` key for the cache's
    /// lifetime.
    pub fn open<F>(
        cache: &RegionCache,
        medium_id: &str,
        region_name: &str,
        open: F,
        config: TableConfig,
    ) -> StoreResult<Self>
    where
        F: FnOnce() -> MediumResult<Arc<dyn GridRegion>>,
    {
        let region = cache.get_or_open(medium_id, region_name, open)?;
        Self::new(region, region_name, config)
    }

    /// The frozen field schema
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// The region this store is bound to
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Drop the materialized record cache.
    ///
    /// Every mutating operation calls this before returning; callers only
    /// need it after editing the region through some other channel.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// All non-blank records, in row order. Served from the cache; the
    /// medium is read at most once between invalidations.
    pub fn records(&mut self) -> StoreResult<Vec<Record>> {
        let materialized = self.materialized()?;
        Ok(materialized
            .records
            .iter()
            .zip(&materialized.empty)
            .filter(|(_, empty)| !**empty)
            .map(|(record, _)| record.clone())
            .collect())
    }

    /// Point lookup of a single row.
    ///
    /// Bypasses the cache and reads the one row directly, so a caller doing
    /// a low-latency check does not pay for a full-region materialization.
    pub fn record_at(&self, row: u32) -> StoreResult<Record> {
        if row < self.schema.data_row_first() || row > self.region.row_count()? {
            return Err(StoreError::RowOutOfRange {
                row,
                region: self.region_name.clone(),
            });
        }
        let cells = self.region.read(
            row,
            self.schema.data_column_first(),
            1,
            self.schema.width(),
        )?;
        let empty_row = Vec::new();
        Ok(self.row_to_record(row, cells.first().unwrap_or(&empty_row)))
    }

    /// Non-blank records grouped by the hash of `keys`.
    ///
    /// Two records sharing a hash is a contract violation (duplicate
    /// identity on the grid) and fails fast rather than silently keeping
    /// one of them.
    pub fn records_by_key(&mut self, keys: &[String]) -> StoreResult<HashMap<String, Record>> {
        self.require_fields(keys)?;
        let records = self.records()?;
        let mut grouped = HashMap::with_capacity(records.len());
        for record in records {
            let key = record.hash_key(keys);
            if grouped.insert(key.clone(), record).is_some() {
                return Err(StoreError::IdentityCollision {
                    region: self.region_name.clone(),
                    key,
                });
            }
        }
        Ok(grouped)
    }

    /// Validate that the schema declares every name in `fields`
    pub(crate) fn require_fields<'a, I>(&self, fields: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for field in fields {
            if !self.schema.contains(field) {
                return Err(StoreError::UnknownField {
                    field: field.clone(),
                    region: self.region_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// The materialized record cache, reading the full data region on first
    /// use after an invalidation.
    pub(crate) fn materialized(&mut self) -> StoreResult<&Materialized> {
        if self.cache.is_none() {
            self.cache = Some(self.read_region()?);
        }
        Ok(self.cache.as_ref().expect("cache populated above"))
    }

    fn read_region(&self) -> StoreResult<Materialized> {
        let first = self.schema.data_row_first();
        let total_rows = self.region.row_count()?;
        if total_rows < first {
            return Ok(Materialized {
                records: Vec::new(),
                empty: Vec::new(),
            });
        }

        let height = total_rows - first + 1;
        let block = self.region.read(
            first,
            self.schema.data_column_first(),
            height,
            self.schema.width(),
        )?;

        let mut records = Vec::with_capacity(block.len());
        let mut empty = Vec::with_capacity(block.len());
        for (i, cells) in block.iter().enumerate() {
            let record = self.row_to_record(first + i as u32, cells);
            empty.push(record.is_blank());
            records.push(record);
        }
        Ok(Materialized { records, empty })
    }

    /// Convert one raw grid row into a record bound to `row`
    pub(crate) fn row_to_record(&self, row: u32, cells: &[CellValue]) -> Record {
        let mut record = Record::new();
        for (name, offset) in self.schema.fields() {
            let value = cells
                .get(offset as usize)
                .cloned()
                .unwrap_or(CellValue::Empty);
            record.set(name, value.normalized());
        }
        record.set_row(row);
        record
    }

    /// Serialize a record into one grid row of the schema's width.
    ///
    /// Fields the record leaves unset take `fill`; absent values are
    /// written as the empty string per the medium convention.
    pub(crate) fn record_to_row(&self, record: &Record, fill: &CellValue) -> Vec<CellValue> {
        let mut row = vec![CellValue::Text(String::new()); self.schema.width() as usize];
        for (name, offset) in self.schema.fields() {
            let value = if record.has(name) {
                record.value(name).to_medium()
            } else {
                fill.to_medium()
            };
            row[offset as usize] = value;
        }
        row
    }

    /// Highest non-blank data row, or `data_row_first - 1` when the region
    /// holds no data yet.
    pub(crate) fn last_used_row(&mut self) -> StoreResult<u32> {
        let first = self.schema.data_row_first();
        let materialized = self.materialized()?;
        let last = materialized
            .empty
            .iter()
            .enumerate()
            .filter(|(_, empty)| !**empty)
            .map(|(i, _)| first + i as u32)
            .max();
        Ok(last.unwrap_or(first - 1))
    }

    pub(crate) fn region(&self) -> &dyn GridRegion {
        self.region.as_ref()
    }

    pub(crate) fn default_value(&self) -> &CellValue {
        &self.default_value
    }

    pub(crate) fn formats(&self) -> &[(String, String)] {
        &self.formats
    }
}
