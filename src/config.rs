//! Engine configuration - consolidates the tuning knobs that would otherwise
//! be duplicated across components into a single struct passed to the engine.

use crate::stats::Operation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the profile builder derives the column set from heterogeneous rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStrictness {
    /// Validate that every row carries exactly the first row's keys and fail
    /// fast with a descriptive error on the first mismatch.
    Strict,
    /// Take the first row's keys as the schema and ignore later rows'
    /// deviations. Missing keys read as null downstream.
    FirstRow,
}

/// How strictly chart specs are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStrictness {
    /// Require `mark` and `encoding` with at least one positional/visual
    /// channel (x, y, color, size, shape).
    Base,
    /// Additionally require the exact `$schema` value and recognize the
    /// wider channel set (tooltip, detail, opacity).
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Distinct-to-sample ratio below which a column classifies as ordinal.
    pub ordinal_threshold: f64,

    /// Cap on each of the three sample slices drawn per column during type
    /// inference.
    pub sample_slice_cap: usize,

    pub schema_strictness: SchemaStrictness,

    pub chart_strictness: ChartStrictness,

    /// Operations the statistics engine will accept. Requests naming an
    /// operation outside this set fail with an invalid-operation error.
    pub enabled_operations: HashSet<Operation>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ordinal_threshold: 0.3,
            sample_slice_cap: 30,
            schema_strictness: SchemaStrictness::Strict,
            chart_strictness: ChartStrictness::Base,
            enabled_operations: Operation::all().into_iter().collect(),
        }
    }
}
