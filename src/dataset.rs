//! Dataset model - ordered rows of scalar JSON values plus the per-request
//! context that owns them for the lifetime of one analysis call.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// A single row: ordered mapping from column name to scalar value.
pub type Row = Map<String, Value>;

/// An uploaded dataset, already parsed into row objects by the caller.
pub type Dataset = Vec<Row>;

lazy_static! {
    static ref CURRENCY_CHARS: Regex = Regex::new(r"[$,]").unwrap();
}

/// Per-request holder for the active dataset. Each incoming request owns its
/// own context; nothing is shared across requests. Rows are never added,
/// removed, or mutated once the context is built.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    rows: Dataset,
}

impl DatasetContext {
    pub fn new(rows: Dataset) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-row order. Empty for an empty dataset.
    pub fn column_names(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Value of a column in a row, null when the key is absent.
pub fn field_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    row.get(column).unwrap_or(&NULL)
}

/// Parse a value as a finite number without any cleanup. Used by type
/// inference and by ordering comparisons in filters.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Coerce a value for aggregation: strip currency formatting ($ and
/// thousands separators) before the numeric parse. Values that still fail
/// to parse are excluded from the aggregate by the caller.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned = CURRENCY_CHARS.replace_all(s.trim(), "");
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Stringify a raw value for use as a group key. Strings come through
/// unquoted; everything else uses its JSON rendering.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Round to a fixed number of decimal places, half away from zero.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
