//! Key-specification resolution
//!
//! Callers declare a store's fields in one of three shapes; all three
//! normalize into a single [`FieldSchema`] exactly once, at store
//! construction. Nothing past the resolver ever branches on the input
//! shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::types::FieldSchema;
use crate::grid::GridRegion;

/// How a store learns its field → column mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// Ordered field names; position in the list becomes the column offset
    Names(Vec<String>),
    /// Explicit field-name → zero-based-offset mapping
    Offsets(HashMap<String, u32>),
    /// Read the header row at first use and take every non-empty cell as a
    /// field name at its column offset
    #[default]
    Discover,
}

/// Anchoring offsets for a region: where headers sit and where data begins.
#[derive(Debug, Clone, Copy)]
pub struct RegionLayout {
    /// 1-based header row, if the region has one
    pub keys_row: Option<u32>,
    /// 1-based first data row
    pub data_row_first: u32,
    /// 1-based first field column
    pub data_column_first: u32,
}

/// Resolve `spec` into a frozen [`FieldSchema`] for `region`.
///
/// Validates the layout anchors against the 1-based addressing contract,
/// then normalizes the spec. Only [`KeySpec::Discover`] touches the medium;
/// the other shapes resolve from the specification alone.
pub fn resolve(
    spec: &KeySpec,
    layout: RegionLayout,
    region: &dyn GridRegion,
    region_name: &str,
) -> SchemaResult<FieldSchema> {
    validate_layout(layout, region_name)?;

    let pairs = match spec {
        KeySpec::Names(names) => names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as u32))
            .collect(),
        KeySpec::Offsets(map) => {
            let mut pairs: Vec<(String, u32)> =
                map.iter().map(|(name, offset)| (name.clone(), *offset)).collect();
            // Deterministic validation order regardless of map iteration.
            pairs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            pairs
        }
        KeySpec::Discover => discover_header(layout, region, region_name)?,
    };

    FieldSchema::new(
        pairs,
        layout.keys_row,
        layout.data_row_first,
        layout.data_column_first,
        region_name,
    )
}

/// Rows and columns are 1-based; a zero anchor would underflow the first
/// address computation, so it is rejected here as a fatal schema error.
fn validate_layout(layout: RegionLayout, region_name: &str) -> SchemaResult<()> {
    let anchor = if layout.data_row_first == 0 {
        Some("data_row_first")
    } else if layout.data_column_first == 0 {
        Some("data_column_first")
    } else if layout.keys_row == Some(0) {
        Some("keys_row")
    } else {
        None
    };
    match anchor {
        Some(anchor) => Err(SchemaError::InvalidLayout {
            region: region_name.to_string(),
            anchor,
        }),
        None => Ok(()),
    }
}

fn discover_header(
    layout: RegionLayout,
    region: &dyn GridRegion,
    region_name: &str,
) -> SchemaResult<Vec<(String, u32)>> {
    let keys_row = layout.keys_row.ok_or_else(|| SchemaError::NoHeaderRow {
        region: region_name.to_string(),
    })?;

    let total_cols = region.column_count()?;
    if total_cols < layout.data_column_first {
        return Err(SchemaError::NoSchemaFound {
            region: region_name.to_string(),
            keys_row,
        });
    }
    let width = total_cols - layout.data_column_first + 1;
    let header = region.read(keys_row, layout.data_column_first, 1, width)?;

    let mut pairs = Vec::new();
    if let Some(cells) = header.first() {
        for (offset, cell) in cells.iter().enumerate() {
            let name = cell.display_string().trim().to_string();
            if !name.is_empty() {
                pairs.push((name, offset as u32));
            }
        }
    }

    if pairs.is_empty() {
        return Err(SchemaError::NoSchemaFound {
            region: region_name.to_string(),
            keys_row,
        });
    }
    Ok(pairs)
}
