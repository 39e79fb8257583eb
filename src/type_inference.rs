//! Semantic type inference over raw column values.
//!
//! Classifies a column into one of four visualization-facing types from a
//! bounded sample drawn from the start, middle, and end of the column. A
//! prefix-only sample misclassifies columns whose early rows are
//! unrepresentative (leading zeros, sorted sections), so all three regions
//! contribute.

use crate::config::EngineConfig;
use crate::dataset::parse_number;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// The role a column plays for visualization purposes, distinct from its raw
/// storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Quantitative,
    Temporal,
    Ordinal,
    Nominal,
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SemanticType::Quantitative => "quantitative",
            SemanticType::Temporal => "temporal",
            SemanticType::Ordinal => "ordinal",
            SemanticType::Nominal => "nominal",
        };
        write!(f, "{}", name)
    }
}

const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
];

pub struct TypeInferencer {
    slice_cap: usize,
    ordinal_threshold: f64,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self {
            slice_cap: 30,
            ordinal_threshold: 0.3,
        }
    }
}

impl TypeInferencer {
    pub fn new(slice_cap: usize, ordinal_threshold: f64) -> Self {
        Self {
            slice_cap,
            ordinal_threshold,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.sample_slice_cap, config.ordinal_threshold)
    }

    /// Classify a column from its raw values. First match wins:
    /// quantitative, then temporal, then ordinal by low distinct-value
    /// ratio, then nominal as the fallback.
    pub fn infer(&self, values: &[Value]) -> SemanticType {
        let sample: Vec<&Value> = self
            .sample_indices(values.len())
            .into_iter()
            .map(|i| &values[i])
            .filter(|v| !v.is_null())
            .collect();

        if sample.is_empty() {
            return SemanticType::Nominal;
        }

        if sample.iter().all(|v| parse_number(v).is_some()) {
            return SemanticType::Quantitative;
        }

        if sample.iter().all(|v| is_temporal(v)) {
            return SemanticType::Temporal;
        }

        let distinct: HashSet<String> = sample.iter().map(|v| v.to_string()).collect();
        let ratio = distinct.len() as f64 / sample.len() as f64;
        if ratio < self.ordinal_threshold {
            SemanticType::Ordinal
        } else {
            SemanticType::Nominal
        }
    }

    /// Indices of the sampled values: up to `slice_cap` each from the start,
    /// the 1/3 point, and the end. Short columns are taken whole so no index
    /// is sampled twice.
    fn sample_indices(&self, len: usize) -> Vec<usize> {
        if len <= self.slice_cap * 3 {
            return (0..len).collect();
        }
        let mid = len / 3;
        (0..self.slice_cap)
            .chain(mid..mid + self.slice_cap)
            .chain(len - self.slice_cap..len)
            .collect()
    }
}

/// A value is temporal when it is a string parsing as a calendar date in one
/// of the supported formats (RFC 3339 timestamps included).
fn is_temporal(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let s = s.trim();
    if chrono::DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
}
