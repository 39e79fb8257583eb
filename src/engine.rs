//! Analysis engine facade - wires profiling, field resolution, filtering,
//! statistics, chart validation, and response normalization into one audited
//! call per request.

use crate::chart_spec::{attach_data, ChartSpecValidator};
use crate::config::EngineConfig;
use crate::dataset::DatasetContext;
use crate::error::{EngineError, Result};
use crate::llm::{LlmClient, ResolvedRequest};
use crate::profile::{DatasetProfile, ProfileBuilder};
use crate::response::{normalize, ResponseCandidate, ResponseEnvelope};
use crate::stats::StatisticsEngine;
use tracing::{info, warn};
use uuid::Uuid;

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Profile the context's dataset: column list, semantic types, samples.
    pub fn profile(&self, ctx: &DatasetContext) -> Result<DatasetProfile> {
        ProfileBuilder::new(&self.config).build(ctx.rows())
    }

    /// Execute a resolved request end to end and produce a canonical
    /// envelope. The chart spec, when present, is validated against the
    /// profile and decorated with the dataset rows; an invalid spec fails
    /// with the complete issue list so the upstream resolver can
    /// self-correct.
    pub fn respond(
        &self,
        resolved: &ResolvedRequest,
        ctx: &DatasetContext,
    ) -> Result<ResponseEnvelope> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            operations = resolved.operations.len(),
            has_chart = resolved.chart_spec.is_some(),
            "running analysis request"
        );

        let profile = self.profile(ctx)?;

        let chart_spec = match &resolved.chart_spec {
            Some(spec) => {
                let validator = ChartSpecValidator::new(self.config.chart_strictness);
                let validation = validator.validate(Some(spec), Some(&profile));
                if !validation.valid {
                    return Err(EngineError::InvalidChartSpec {
                        issues: validation.issues,
                    });
                }
                let mut decorated = spec.clone();
                attach_data(&mut decorated, ctx.rows());
                Some(decorated)
            }
            None => None,
        };

        if resolved.operations.len() > 1 {
            warn!(%run_id, "multiple operations resolved, computing the first");
        }
        let output = match resolved.operations.first() {
            Some(request) => {
                let stats = StatisticsEngine::new(self.config.clone());
                let result = stats.compute(request, ctx)?;
                info!(
                    %run_id,
                    operation = %result.operation,
                    field = %result.field,
                    processed = result.processed_count,
                    total = result.total_count,
                    "statistic computed"
                );
                Some(serde_json::to_value(&result)?)
            }
            None => None,
        };

        normalize(ResponseCandidate {
            chart_spec,
            output,
            description: resolved.description.clone(),
        })
    }

    /// Answer a free-text question: profile the dataset, let the collaborator
    /// resolve the question into operations, then compute and normalize.
    pub async fn answer(
        &self,
        question: &str,
        llm: &LlmClient,
        ctx: &DatasetContext,
    ) -> Result<ResponseEnvelope> {
        let profile = self.profile(ctx)?;
        let resolved = llm.resolve_request(question, &profile).await?;
        self.respond(&resolved, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::stats::OperationRequest;
    use serde_json::json;

    fn ctx() -> DatasetContext {
        let rows: Dataset = serde_json::from_value(json!([
            {"Origin": "USA", "MPG": 20},
            {"Origin": "USA", "MPG": 30},
            {"Origin": "Japan", "MPG": 40}
        ]))
        .unwrap();
        DatasetContext::new(rows)
    }

    fn mean_by_origin() -> OperationRequest {
        OperationRequest {
            operation: "mean".to_string(),
            field: "MPG".to_string(),
            field2: None,
            group_by: Some("Origin".to_string()),
            filters: Vec::new(),
        }
    }

    #[test]
    fn test_statistics_only_flow() {
        let resolved = ResolvedRequest {
            operations: vec![mean_by_origin()],
            chart_spec: None,
            description: None,
        };
        let envelope = AnalysisEngine::with_defaults()
            .respond(&resolved, &ctx())
            .unwrap();
        let output = envelope.output().unwrap();
        assert_eq!(output["success"], json!(true));
        assert_eq!(output["output"]["USA"], json!(25.0));
        assert_eq!(output["output"]["Japan"], json!(40.0));
    }

    #[test]
    fn test_combined_flow_decorates_chart() {
        let resolved = ResolvedRequest {
            operations: vec![mean_by_origin()],
            chart_spec: Some(json!({
                "mark": "bar",
                "encoding": {
                    "x": {"field": "Origin", "type": "nominal"},
                    "y": {"field": "MPG", "type": "quantitative", "aggregate": "mean"}
                }
            })),
            description: Some("Average MPG by origin".to_string()),
        };
        let envelope = AnalysisEngine::with_defaults()
            .respond(&resolved, &ctx())
            .unwrap();
        assert!(matches!(envelope, ResponseEnvelope::Combined { .. }));
        let chart = envelope.chart_spec().unwrap();
        assert_eq!(chart["data"]["values"].as_array().unwrap().len(), 3);
        assert_eq!(envelope.description(), "Average MPG by origin");
    }

    #[test]
    fn test_invalid_chart_fails_with_issues() {
        let resolved = ResolvedRequest {
            operations: Vec::new(),
            chart_spec: Some(json!({
                "mark": "bar",
                "encoding": {"x": {"field": "Weight"}}
            })),
            description: None,
        };
        match AnalysisEngine::with_defaults().respond(&resolved, &ctx()) {
            Err(EngineError::InvalidChartSpec { issues }) => {
                assert!(issues.iter().any(|i| i.contains("Weight")));
            }
            other => panic!("expected InvalidChartSpec, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_resolution_is_invalid_shape() {
        let resolved = ResolvedRequest::default();
        assert!(matches!(
            AnalysisEngine::with_defaults().respond(&resolved, &ctx()),
            Err(EngineError::InvalidResponseShape)
        ));
    }
}
