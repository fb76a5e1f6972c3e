//! Records: one logical row as named field values plus its row identity
//!
//! A [`Record`] is created either by the store's materializer (in which case
//! it carries the 1-based grid row it came from) or by a caller preparing
//! data to insert (in which case `row` is unset and the record is a
//! *candidate* not yet persisted).
//!
//! Record identity for merge/grouping purposes is a **hash key**: the
//! display strings of one or more designated key fields joined with a
//! separator that cannot occur in cell text.

mod value;

pub use value::CellValue;

use std::collections::HashMap;

/// Separator between key-field values in a hash key.
///
/// The ASCII unit separator never appears in normal cell text, so two
/// distinct key tuples can never join to the same string.
pub const HASH_KEY_SEPARATOR: char = '\u{1f}';

/// One logical row: named field values plus an optional physical row number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: HashMap<String, CellValue>,
    row: Option<u32>,
}

impl Record {
    /// Create an empty candidate record (no persisted row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from field/value pairs
    pub fn from_fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    /// The 1-based grid row this record was materialized from, if any
    pub fn row(&self) -> Option<u32> {
        self.row
    }

    /// Bind the record to a physical row
    pub fn set_row(&mut self, row: u32) {
        self.row = Some(row);
    }

    /// Builder-style variant of [`Record::set_row`]
    pub fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    /// Detach the record from its physical row, turning it back into a candidate
    pub fn clear_row(&mut self) {
        self.row = None;
    }

    /// The value of `field`, or [`CellValue::Empty`] when the field is unset
    pub fn value(&self, field: &str) -> &CellValue {
        self.fields.get(field).unwrap_or(&CellValue::Empty)
    }

    /// True iff the caller explicitly supplied `field` (even as `Empty`)
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field value, normalizing empty strings to the absent marker
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into(), value.into().normalized());
    }

    /// Iterate over explicitly set fields (order unspecified)
    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of explicitly set fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True iff no field is explicitly set
    pub fn is_unset(&self) -> bool {
        self.fields.is_empty()
    }

    /// True iff every set field holds the absent marker.
    ///
    /// This is the record-side view of the store's row-emptiness flag: a
    /// materialized record for a blank grid row answers true here.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(CellValue::is_empty)
    }

    /// Derive the hash key over `keys`.
    ///
    /// Unset key fields contribute the empty string, mirroring how they
    /// round-trip through the medium. Callers validate key names against the
    /// schema before grouping; this function does not.
    pub fn hash_key(&self, keys: &[String]) -> String {
        let mut out = String::new();
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                out.push(HASH_KEY_SEPARATOR);
            }
            out.push_str(&self.value(key).display_string());
        }
        out
    }
}
