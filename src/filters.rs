//! Filter evaluation - applies an ordered, conjunctive list of predicates to
//! rows ahead of aggregation.

use crate::dataset::{field_value, parse_number, Row};
use crate::field_resolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

/// Apply filters to rows. A filter whose field does not resolve is skipped
/// rather than rejecting the whole row set, so one bad filter does not blank
/// out an entire analysis. Rows must satisfy every remaining filter.
pub fn apply_filters<'a>(rows: &'a [Row], filters: &[Filter], columns: &[String]) -> Vec<&'a Row> {
    let resolved: Vec<(&Filter, &str)> = filters
        .iter()
        .filter_map(|filter| match field_resolver::resolve(&filter.field, columns) {
            Ok(column) => Some((filter, column)),
            Err(_) => {
                debug!(field = %filter.field, "skipping filter on unresolvable field");
                None
            }
        })
        .collect();

    rows.iter()
        .filter(|row| {
            resolved
                .iter()
                .all(|(filter, column)| matches(row, column, filter))
        })
        .collect()
}

fn matches(row: &Row, column: &str, filter: &Filter) -> bool {
    let actual = field_value(row, column);
    match filter.operator {
        FilterOperator::Eq => values_equal(actual, &filter.value),
        FilterOperator::Ne => !values_equal(actual, &filter.value),
        FilterOperator::Gt | FilterOperator::Lt | FilterOperator::Ge | FilterOperator::Le => {
            // Ordering compares numerically; a non-numeric operand excludes
            // the row rather than erroring.
            match (parse_number(actual), parse_number(&filter.value)) {
                (Some(a), Some(b)) => match filter.operator {
                    FilterOperator::Gt => a > b,
                    FilterOperator::Lt => a < b,
                    FilterOperator::Ge => a >= b,
                    FilterOperator::Le => a <= b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
    }
}

/// Equality is case-insensitive when both sides are strings, direct otherwise.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.to_lowercase() == y.to_lowercase(),
        _ => a == b,
    }
}
