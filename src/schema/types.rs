//! Field schema: the frozen field-name → column-offset mapping
//!
//! A schema is resolved exactly once per store instance and is immutable
//! afterwards. Data caches come and go with every mutation; the schema
//! deliberately survives all of them, so a caller editing rows around the
//! region can never trigger an accidental re-derivation.

use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult};

/// Immutable mapping of field names to zero-based column offsets, plus the
/// row/column offsets that anchor the data region on the medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// `(name, offset)` pairs ordered by offset
    fields: Vec<(String, u32)>,
    by_name: HashMap<String, u32>,
    keys_row: Option<u32>,
    data_row_first: u32,
    data_column_first: u32,
}

impl FieldSchema {
    /// Build a schema from `(name, offset)` pairs, validating that no name
    /// and no offset is claimed twice.
    pub fn new(
        pairs: Vec<(String, u32)>,
        keys_row: Option<u32>,
        data_row_first: u32,
        data_column_first: u32,
        region: &str,
    ) -> SchemaResult<Self> {
        if pairs.is_empty() {
            return Err(SchemaError::EmptyKeySpec {
                region: region.to_string(),
            });
        }

        let mut by_name: HashMap<String, u32> = HashMap::with_capacity(pairs.len());
        let mut by_offset: HashMap<u32, String> = HashMap::with_capacity(pairs.len());
        for (name, offset) in &pairs {
            if by_name.insert(name.clone(), *offset).is_some() {
                return Err(SchemaError::DuplicateField {
                    field: name.clone(),
                    region: region.to_string(),
                });
            }
            if let Some(first) = by_offset.insert(*offset, name.clone()) {
                return Err(SchemaError::ColumnConflict {
                    first,
                    second: name.clone(),
                    offset: *offset,
                    region: region.to_string(),
                });
            }
        }

        let mut fields = pairs;
        fields.sort_by_key(|(_, offset)| *offset);

        Ok(Self {
            fields,
            by_name,
            keys_row,
            data_row_first,
            data_column_first,
        })
    }

    /// Zero-based column offset of `field`, if the schema knows it
    pub fn offset_of(&self, field: &str) -> Option<u32> {
        self.by_name.get(field).copied()
    }

    /// True iff the schema declares `field`
    pub fn contains(&self, field: &str) -> bool {
        self.by_name.contains_key(field)
    }

    /// Field names in ascending offset order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, offset)` pairs in ascending offset order
    pub fn fields(&self) -> impl Iterator<Item = (&str, u32)> {
        self.fields.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True iff no field is declared (unreachable for a resolved schema)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Width of the data block in columns: highest offset plus one
    pub fn width(&self) -> u32 {
        self.fields.last().map(|(_, o)| o + 1).unwrap_or(0)
    }

    /// 1-based header row, if the region declares one
    pub fn keys_row(&self) -> Option<u32> {
        self.keys_row
    }

    /// 1-based row where data begins
    pub fn data_row_first(&self) -> u32 {
        self.data_row_first
    }

    /// 1-based column where the field block begins
    pub fn data_column_first(&self) -> u32 {
        self.data_column_first
    }

    /// Absolute 1-based column of `field`
    pub fn column_of(&self, field: &str) -> Option<u32> {
        self.offset_of(field).map(|o| self.data_column_first + o)
    }

    /// Absolute 1-based column of the schema's last field
    pub fn last_column(&self) -> u32 {
        self.data_column_first + self.width().saturating_sub(1)
    }

    /// Column letter of the schema's last field (`"C"`, `"AA"`, ...)
    pub fn last_column_letter(&self) -> String {
        column_letter(self.last_column())
    }
}

/// Convert a 1-based column number to its letter form: 1 → "A", 27 → "AA".
pub fn column_letter(col: u32) -> String {
    if col < 1 {
        return "A".to_string();
    }
    let mut letters = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters
}
