//! Chart spec validation and decoration.
//!
//! Structural checks over the visualization grammar spec handed back by the
//! request-resolution collaborator: a mark, at least one recognized encoding
//! channel, and (when a dataset profile is supplied) every encoded field
//! resolving to an actual column. All problems are accumulated into one
//! issue list so the upstream layer gets complete, actionable feedback for
//! self-correction instead of failing on the first problem.

use crate::config::ChartStrictness;
use crate::dataset::Row;
use crate::field_resolver;
use crate::profile::DatasetProfile;
use serde::Serialize;
use serde_json::{json, Value};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

const BASE_CHANNELS: [&str; 5] = ["x", "y", "color", "size", "shape"];
const EXTENDED_CHANNELS: [&str; 3] = ["tooltip", "detail", "opacity"];

#[derive(Debug, Clone, Serialize)]
pub struct ChartValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl ChartValidation {
    fn invalid(issue: &str) -> Self {
        Self {
            valid: false,
            issues: vec![issue.to_string()],
        }
    }
}

pub struct ChartSpecValidator {
    strictness: ChartStrictness,
}

impl ChartSpecValidator {
    pub fn new(strictness: ChartStrictness) -> Self {
        Self { strictness }
    }

    fn recognized_channels(&self) -> Vec<&'static str> {
        let mut channels: Vec<&'static str> = BASE_CHANNELS.to_vec();
        if self.strictness == ChartStrictness::Strict {
            channels.extend(EXTENDED_CHANNELS);
        }
        channels
    }

    pub fn validate(&self, spec: Option<&Value>, profile: Option<&DatasetProfile>) -> ChartValidation {
        let Some(spec) = spec else {
            return ChartValidation::invalid("chart spec is missing");
        };
        if spec.is_null() {
            return ChartValidation::invalid("chart spec is missing");
        }
        let Some(obj) = spec.as_object() else {
            return ChartValidation::invalid("chart spec must be a JSON object");
        };

        let mut issues = Vec::new();

        if self.strictness == ChartStrictness::Strict {
            match obj.get("$schema").and_then(|s| s.as_str()) {
                Some(schema) if schema == VEGA_LITE_SCHEMA => {}
                Some(schema) => issues.push(format!(
                    "unsupported $schema '{}', expected '{}'",
                    schema, VEGA_LITE_SCHEMA
                )),
                None => issues.push(format!("missing required '$schema' ('{}')", VEGA_LITE_SCHEMA)),
            }
        }

        if !obj.contains_key("mark") {
            issues.push("missing required 'mark'".to_string());
        }

        match obj.get("encoding").and_then(|e| e.as_object()) {
            None => issues.push("missing required 'encoding'".to_string()),
            Some(encoding) => {
                let recognized = self.recognized_channels();
                let has_recognized = encoding.keys().any(|k| recognized.contains(&k.as_str()));
                if !has_recognized {
                    issues.push(format!(
                        "encoding declares no recognized channel (expected one of: {})",
                        recognized.join(", ")
                    ));
                }

                if let Some(profile) = profile {
                    let columns = profile.column_names();
                    for (channel, descriptor) in encoding {
                        if let Some(field) = descriptor.get("field").and_then(|f| f.as_str()) {
                            if field_resolver::resolve(field, &columns).is_err() {
                                issues.push(format!(
                                    "channel '{}' references unknown field '{}'",
                                    channel, field
                                ));
                            }
                        }
                    }
                }
            }
        }

        ChartValidation {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Decorate a validated spec with the grammar version and the full dataset
/// rows inlined as `data.values`, ready for the presentation layer.
pub fn attach_data(spec: &mut Value, rows: &[Row]) {
    if let Some(obj) = spec.as_object_mut() {
        obj.entry("$schema".to_string())
            .or_insert_with(|| json!(VEGA_LITE_SCHEMA));
        let values: Vec<Value> = rows.iter().map(|row| Value::Object(row.clone())).collect();
        obj.insert("data".to_string(), json!({ "values": values }));
    }
}
