//! Dataset profiling - per-column semantic types and sample values, used to
//! answer "what columns exist" questions and to ground chart validation.

use crate::config::{EngineConfig, SchemaStrictness};
use crate::dataset::Row;
use crate::error::{EngineError, Result};
use crate::type_inference::{SemanticType, TypeInferencer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Leading sample values recorded per column, verbatim, for explainability.
pub const MAX_SAMPLE_VALUES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: SemanticType,
    pub sample_values: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub columns: Vec<ColumnProfile>,
    pub row_count: usize,
}

impl DatasetProfile {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

pub struct ProfileBuilder {
    inferencer: TypeInferencer,
    strictness: SchemaStrictness,
}

impl ProfileBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inferencer: TypeInferencer::from_config(config),
            strictness: config.schema_strictness,
        }
    }

    /// Build the profile for one dataset. The column set comes from the
    /// first row; under strict schema checking every later row must carry
    /// exactly those keys.
    pub fn build(&self, rows: &[Row]) -> Result<DatasetProfile> {
        let first = rows.first().ok_or(EngineError::EmptyDataset)?;
        let columns: Vec<String> = first.keys().cloned().collect();

        if self.strictness == SchemaStrictness::Strict {
            self.check_schema(rows, &columns)?;
        }

        let profiles = columns
            .iter()
            .map(|name| {
                let values: Vec<Value> = rows
                    .iter()
                    .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                let semantic_type = self.inferencer.infer(&values);
                debug!(column = %name, %semantic_type, "profiled column");
                ColumnProfile {
                    name: name.clone(),
                    semantic_type,
                    sample_values: values.into_iter().take(MAX_SAMPLE_VALUES).collect(),
                }
            })
            .collect();

        Ok(DatasetProfile {
            columns: profiles,
            row_count: rows.len(),
        })
    }

    fn check_schema(&self, rows: &[Row], columns: &[String]) -> Result<()> {
        let expected: HashSet<&str> = columns.iter().map(|c| c.as_str()).collect();
        for (idx, row) in rows.iter().enumerate().skip(1) {
            for name in columns {
                if !row.contains_key(name) {
                    return Err(EngineError::SchemaMismatch {
                        row: idx,
                        detail: format!("missing column '{}'", name),
                    });
                }
            }
            for key in row.keys() {
                if !expected.contains(key.as_str()) {
                    return Err(EngineError::SchemaMismatch {
                        row: idx,
                        detail: format!("unexpected column '{}'", key),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_profile_types_and_samples() {
        let rows = rows(json!([
            {"name": "Ada", "age": 36, "joined": "2020-01-15"},
            {"name": "Grace", "age": 45, "joined": "2019-06-01"},
            {"name": "Edsger", "age": 72, "joined": "2021-11-30"},
            {"name": "Barbara", "age": 58, "joined": "2022-03-08"}
        ]));
        let profile = ProfileBuilder::new(&EngineConfig::default())
            .build(&rows)
            .unwrap();

        assert_eq!(profile.row_count, 4);
        assert_eq!(profile.column_names(), vec!["name", "age", "joined"]);

        let age = &profile.columns[1];
        assert_eq!(age.semantic_type, SemanticType::Quantitative);
        assert_eq!(age.sample_values, vec![json!(36), json!(45), json!(72)]);

        let joined = &profile.columns[2];
        assert_eq!(joined.semantic_type, SemanticType::Temporal);
    }

    #[test]
    fn test_empty_dataset_fails() {
        let result = ProfileBuilder::new(&EngineConfig::default()).build(&[]);
        assert!(matches!(result, Err(EngineError::EmptyDataset)));
    }

    #[test]
    fn test_strict_schema_rejects_irregular_rows() {
        let rows = rows(json!([
            {"a": 1, "b": 2},
            {"a": 3}
        ]));
        let result = ProfileBuilder::new(&EngineConfig::default()).build(&rows);
        assert!(matches!(
            result,
            Err(EngineError::SchemaMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn test_first_row_strictness_tolerates_irregular_rows() {
        let rows = rows(json!([
            {"a": 1, "b": 2},
            {"a": 3, "c": 4}
        ]));
        let config = EngineConfig {
            schema_strictness: SchemaStrictness::FirstRow,
            ..EngineConfig::default()
        };
        let profile = ProfileBuilder::new(&config).build(&rows).unwrap();
        assert_eq!(profile.column_names(), vec!["a", "b"]);
    }
}
