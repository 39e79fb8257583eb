//! Response normalization - reconciles a possibly-absent chart spec and a
//! possibly-absent statistic output into one of three canonical envelope
//! shapes, discriminated explicitly rather than by property presence.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMBINED_DESCRIPTION: &str = "Analysis results";
pub const VISUALIZATION_DESCRIPTION: &str = "Visualization results";
pub const STATISTICS_DESCRIPTION: &str = "Statistical analysis results";

/// The three-shape output contract returned to the presentation layer. A
/// valid envelope always carries at least one of chart spec / output, and a
/// non-empty description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Statistics {
        output: Value,
        description: String,
    },
    Visualization {
        chart_spec: Value,
        description: String,
    },
    Combined {
        chart_spec: Value,
        output: Value,
        description: String,
    },
}

impl ResponseEnvelope {
    pub fn description(&self) -> &str {
        match self {
            ResponseEnvelope::Statistics { description, .. }
            | ResponseEnvelope::Visualization { description, .. }
            | ResponseEnvelope::Combined { description, .. } => description,
        }
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            ResponseEnvelope::Statistics { output, .. }
            | ResponseEnvelope::Combined { output, .. } => Some(output),
            ResponseEnvelope::Visualization { .. } => None,
        }
    }

    pub fn chart_spec(&self) -> Option<&Value> {
        match self {
            ResponseEnvelope::Visualization { chart_spec, .. }
            | ResponseEnvelope::Combined { chart_spec, .. } => Some(chart_spec),
            ResponseEnvelope::Statistics { .. } => None,
        }
    }
}

/// Pre-parsed candidate response. Absence is modeled with `Option`: a JSON
/// null folds to `None` at the parse boundary, while a defined falsy value
/// such as a numeric 0 stays `Some` and counts as present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseCandidate {
    #[serde(default, alias = "chartSpec")]
    pub chart_spec: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Merge a candidate into a canonical envelope, filling a default
/// description when absent or blank. A candidate with neither chart spec nor
/// output is rejected.
pub fn normalize(candidate: ResponseCandidate) -> Result<ResponseEnvelope> {
    let description = candidate
        .description
        .filter(|d| !d.trim().is_empty());

    match (candidate.chart_spec, candidate.output) {
        (Some(chart_spec), Some(output)) => Ok(ResponseEnvelope::Combined {
            chart_spec,
            output,
            description: description.unwrap_or_else(|| COMBINED_DESCRIPTION.to_string()),
        }),
        (Some(chart_spec), None) => Ok(ResponseEnvelope::Visualization {
            chart_spec,
            description: description.unwrap_or_else(|| VISUALIZATION_DESCRIPTION.to_string()),
        }),
        (None, Some(output)) => Ok(ResponseEnvelope::Statistics {
            output,
            description: description.unwrap_or_else(|| STATISTICS_DESCRIPTION.to_string()),
        }),
        (None, None) => Err(EngineError::InvalidResponseShape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_combined_shape() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: Some(json!({"mark": "bar"})),
            output: Some(json!(42)),
            description: None,
        })
        .unwrap();
        assert!(matches!(envelope, ResponseEnvelope::Combined { .. }));
        assert_eq!(envelope.description(), COMBINED_DESCRIPTION);
    }

    #[test]
    fn test_visualization_only_shape() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: Some(json!({"mark": "line"})),
            output: None,
            description: None,
        })
        .unwrap();
        assert!(matches!(envelope, ResponseEnvelope::Visualization { .. }));
        assert_eq!(envelope.description(), VISUALIZATION_DESCRIPTION);
        assert!(envelope.output().is_none());
    }

    #[test]
    fn test_statistics_only_shape() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: None,
            output: Some(json!({"mean": 2.5})),
            description: None,
        })
        .unwrap();
        assert!(matches!(envelope, ResponseEnvelope::Statistics { .. }));
        assert_eq!(envelope.description(), STATISTICS_DESCRIPTION);
    }

    #[test]
    fn test_zero_output_counts_as_present() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: None,
            output: Some(json!(0)),
            description: None,
        })
        .unwrap();
        assert_eq!(envelope.output(), Some(&json!(0)));
    }

    #[test]
    fn test_neither_present_is_rejected() {
        let result = normalize(ResponseCandidate::default());
        assert!(matches!(result, Err(EngineError::InvalidResponseShape)));
    }

    #[test]
    fn test_supplied_description_wins() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: None,
            output: Some(json!(1)),
            description: Some("Average MPG by origin".to_string()),
        })
        .unwrap();
        assert_eq!(envelope.description(), "Average MPG by origin");
    }

    #[test]
    fn test_blank_description_gets_default() {
        let envelope = normalize(ResponseCandidate {
            chart_spec: None,
            output: Some(json!(1)),
            description: Some("   ".to_string()),
        })
        .unwrap();
        assert_eq!(envelope.description(), STATISTICS_DESCRIPTION);
    }

    #[test]
    fn test_json_null_folds_to_absent() {
        let candidate: ResponseCandidate =
            serde_json::from_value(json!({"chart_spec": null, "output": null})).unwrap();
        assert!(normalize(candidate).is_err());
    }
}
