//! Statistics engine - count/mean/median/sum/min/max/correlation over
//! filtered rows, whole-dataset or per-group, with dirty-value coercion and
//! transparency counters in every success payload.

use crate::config::EngineConfig;
use crate::dataset::{coerce_numeric, field_value, round_to, stringify_value, DatasetContext, Row};
use crate::error::{EngineError, Result};
use crate::field_resolver;
use crate::filters::{apply_filters, Filter};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Count,
    Mean,
    Median,
    Sum,
    Min,
    Max,
    Correlation,
}

impl Operation {
    pub fn all() -> Vec<Operation> {
        vec![
            Operation::Count,
            Operation::Mean,
            Operation::Median,
            Operation::Sum,
            Operation::Min,
            Operation::Max,
            Operation::Correlation,
        ]
    }

    pub fn parse(name: &str) -> Result<Operation> {
        match name.trim().to_lowercase().as_str() {
            "count" => Ok(Operation::Count),
            "mean" | "average" | "avg" => Ok(Operation::Mean),
            "median" => Ok(Operation::Median),
            "sum" => Ok(Operation::Sum),
            "min" => Ok(Operation::Min),
            "max" => Ok(Operation::Max),
            "correlation" => Ok(Operation::Correlation),
            other => Err(EngineError::InvalidOperation(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Count => "count",
            Operation::Mean => "mean",
            Operation::Median => "median",
            Operation::Sum => "sum",
            Operation::Min => "min",
            Operation::Max => "max",
            Operation::Correlation => "correlation",
        }
    }
}

/// The resolved, machine-actionable description of what to compute, decided
/// upstream by the request-resolution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation: String,

    pub field: String,

    /// Second field, required only for correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field2: Option<String>,

    #[serde(default, alias = "groupBy", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOutput {
    pub correlation: f64,
    pub field1_stats: FieldStats,
    pub field2_stats: FieldStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatOutput {
    Scalar(f64),
    Correlation(CorrelationOutput),
    /// Group key (stringified raw group value) to aggregate. Sorted by key
    /// for deterministic ordering.
    Grouped(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticResult {
    pub success: bool,
    pub operation: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub output: StatOutput,
    /// Values that survived coercion and entered the aggregate.
    pub processed_count: usize,
    /// Values considered after filtering, before coercion.
    pub total_count: usize,
}

pub struct StatisticsEngine {
    config: EngineConfig,
}

impl StatisticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Compute one operation request over the context's dataset.
    pub fn compute(
        &self,
        request: &OperationRequest,
        ctx: &DatasetContext,
    ) -> Result<StatisticResult> {
        if ctx.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let operation = Operation::parse(&request.operation)?;
        if !self.config.enabled_operations.contains(&operation) {
            return Err(EngineError::InvalidOperation(format!(
                "{} (disabled)",
                operation.name()
            )));
        }

        let columns = ctx.column_names();
        let field = field_resolver::resolve(&request.field, &columns)?.to_string();
        let group_by = match &request.group_by {
            Some(name) => Some(field_resolver::resolve(name, &columns)?.to_string()),
            None => None,
        };

        let rows = apply_filters(ctx.rows(), &request.filters, &columns);
        debug!(
            operation = operation.name(),
            field = %field,
            rows = rows.len(),
            "computing statistic"
        );

        match operation {
            Operation::Correlation => {
                let requested2 = request.field2.as_deref().ok_or_else(|| {
                    EngineError::FieldNotFound {
                        field: "field2".to_string(),
                        available: columns.clone(),
                    }
                })?;
                let field2 = field_resolver::resolve(requested2, &columns)?.to_string();
                self.correlation(&rows, &field, &field2)
            }
            _ => match group_by {
                Some(group_field) => self.grouped(&rows, operation, &field, &group_field),
                None => self.whole(&rows, operation, &field),
            },
        }
    }

    fn whole(&self, rows: &[&Row], operation: Operation, field: &str) -> Result<StatisticResult> {
        let total_count = rows.len();

        if operation == Operation::Count {
            let present = rows
                .iter()
                .filter(|row| !field_value(row, field).is_null())
                .count();
            if present == 0 {
                return Err(EngineError::NoValidData {
                    field: field.to_string(),
                    detail: "no values present".to_string(),
                });
            }
            return Ok(StatisticResult {
                success: true,
                operation: operation.name().to_string(),
                field: field.to_string(),
                field2: None,
                group_by: None,
                output: StatOutput::Scalar(present as f64),
                processed_count: present,
                total_count,
            });
        }

        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| coerce_numeric(field_value(row, field)))
            .collect();
        if values.is_empty() {
            return Err(EngineError::NoValidData {
                field: field.to_string(),
                detail: "no valid numerical data".to_string(),
            });
        }

        Ok(StatisticResult {
            success: true,
            operation: operation.name().to_string(),
            field: field.to_string(),
            field2: None,
            group_by: None,
            output: StatOutput::Scalar(aggregate(operation, &values)),
            processed_count: values.len(),
            total_count,
        })
    }

    fn grouped(
        &self,
        rows: &[&Row],
        operation: Operation,
        field: &str,
        group_field: &str,
    ) -> Result<StatisticResult> {
        let total_count = rows.len();
        let mut output = BTreeMap::new();
        let mut processed_count = 0;

        if operation == Operation::Count {
            // Grouped count counts whole matching rows per group.
            for row in rows {
                let key = stringify_value(field_value(row, group_field));
                *output.entry(key).or_insert(0.0) += 1.0;
            }
            processed_count = total_count;
        } else {
            let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for row in rows {
                let key = stringify_value(field_value(row, group_field));
                // Groups where no value survives coercion never get an
                // entry, so they are dropped from the result entirely.
                if let Some(value) = coerce_numeric(field_value(row, field)) {
                    groups.entry(key).or_default().push(value);
                }
            }
            for (key, values) in groups {
                processed_count += values.len();
                output.insert(key, aggregate(operation, &values));
            }
        }

        if output.is_empty() {
            return Err(EngineError::NoValidData {
                field: field.to_string(),
                detail: "no valid numerical data".to_string(),
            });
        }

        Ok(StatisticResult {
            success: true,
            operation: operation.name().to_string(),
            field: field.to_string(),
            field2: None,
            group_by: Some(group_field.to_string()),
            output: StatOutput::Grouped(output),
            processed_count,
            total_count,
        })
    }

    /// Pearson correlation over pairwise-complete rows, with population
    /// variance and covariance. Each field's mean/min/max is returned as
    /// supporting context.
    fn correlation(
        &self,
        rows: &[&Row],
        field1: &str,
        field2: &str,
    ) -> Result<StatisticResult> {
        let total_count = rows.len();
        let pairs: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|row| {
                let x = coerce_numeric(field_value(row, field1))?;
                let y = coerce_numeric(field_value(row, field2))?;
                Some((x, y))
            })
            .collect();

        if pairs.is_empty() {
            return Err(EngineError::NoValidData {
                field: field1.to_string(),
                detail: "no rows where both fields hold valid numerical data".to_string(),
            });
        }

        let n = pairs.len() as f64;
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;

        let covariance = pairs
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>()
            / n;
        let variance_x = xs.iter().map(|x| (x - mean_x).powi(2)).sum::<f64>() / n;
        let variance_y = ys.iter().map(|y| (y - mean_y).powi(2)).sum::<f64>() / n;

        // Zero variance would divide by zero; surface it as an explicit
        // failure instead of a NaN the caller has to sniff for.
        if variance_x == 0.0 || variance_y == 0.0 {
            let flat = if variance_x == 0.0 { field1 } else { field2 };
            return Err(EngineError::NoValidData {
                field: flat.to_string(),
                detail: "zero variance, correlation is undefined".to_string(),
            });
        }

        let correlation = round_to(covariance / (variance_x * variance_y).sqrt(), 3);

        Ok(StatisticResult {
            success: true,
            operation: Operation::Correlation.name().to_string(),
            field: field1.to_string(),
            field2: Some(field2.to_string()),
            group_by: None,
            output: StatOutput::Correlation(CorrelationOutput {
                correlation,
                field1_stats: field_stats(&xs),
                field2_stats: field_stats(&ys),
            }),
            processed_count: pairs.len(),
            total_count,
        })
    }
}

fn field_stats(values: &[f64]) -> FieldStats {
    let n = values.len() as f64;
    FieldStats {
        mean: round_to(values.iter().sum::<f64>() / n, 2),
        min: round_to(values.iter().cloned().fold(f64::INFINITY, f64::min), 2),
        max: round_to(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 2),
    }
}

/// Aggregate already-coerced values. Callers guarantee `values` is non-empty.
fn aggregate(operation: Operation, values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let result = match operation {
        Operation::Count => n,
        Operation::Mean => values.iter().sum::<f64>() / n,
        Operation::Median => median(values),
        Operation::Sum => values.iter().sum(),
        Operation::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        Operation::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        Operation::Correlation => unreachable!("correlation has its own path"),
    };
    round_to(result, 2)
}

/// Median over a sorted working copy; the source values are left untouched.
fn median(values: &[f64]) -> f64 {
    let sorted: Vec<f64> = values
        .iter()
        .cloned()
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .collect();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
