//! Scalar cell values
//!
//! Every cell on the backing medium holds one of four shapes: text, a
//! number, a boolean, or nothing at all. The medium has no dedicated
//! absent marker of its own; an absent field is persisted as the empty
//! string, and an empty-string cell materializes back as [`CellValue::Empty`].

use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Serializes untagged so configuration files and JSON payloads can carry
/// plain scalars (`"A"`, `5`, `true`, `null`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent value; round-trips as the empty string on the medium
    #[default]
    Empty,
    /// Boolean
    Bool(bool),
    /// 64-bit floating point (the medium does not distinguish int/float)
    Number(f64),
    /// UTF-8 text
    Text(String),
}

impl CellValue {
    /// Returns the shape name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Bool(_) => "bool",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
        }
    }

    /// True iff the value is the absent marker
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Collapses the medium's empty-string representation into [`CellValue::Empty`].
    ///
    /// Applied to every cell during materialization so that emptiness checks
    /// and hash keys never see a stray `Text("")`.
    pub fn normalized(self) -> Self {
        match self {
            CellValue::Text(ref s) if s.is_empty() => CellValue::Empty,
            other => other,
        }
    }

    /// The value as written to the medium: `Empty` becomes the empty string,
    /// everything else passes through unchanged.
    pub fn to_medium(&self) -> CellValue {
        match self {
            CellValue::Empty => CellValue::Text(String::new()),
            other => other.clone(),
        }
    }

    /// String rendering used for hash keys and header names.
    ///
    /// Whole numbers drop their fractional part so that a key built from
    /// `Number(42.0)` reads `"42"`, matching how the medium displays it.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string()).normalized()
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s).normalized()
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}
