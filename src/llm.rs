//! Request-resolution collaborator client.
//!
//! Given the dataset profile and the user's free-text question, the language
//! model returns zero or more operation requests and/or a draft chart spec.
//! The engine only validates and computes over what this client hands back;
//! it never invents an operation.

use crate::error::{EngineError, Result};
use crate::profile::DatasetProfile;
use crate::stats::OperationRequest;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// What the collaborator resolved from the user's question.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedRequest {
    #[serde(default)]
    pub operations: Vec<OperationRequest>,
    #[serde(default, alias = "chartSpec")]
    pub chart_spec: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Resolve a free-text question into operation requests and/or a chart
    /// spec, grounded in the dataset profile. Retries up to 3 times with a
    /// corrective prompt when the model returns unparseable JSON.
    pub async fn resolve_request(
        &self,
        question: &str,
        profile: &DatasetProfile,
    ) -> Result<ResolvedRequest> {
        let prompt = self.build_prompt(question, profile);
        let mut current_prompt = prompt.clone();
        let mut last_error = String::new();

        for attempt in 1..=3 {
            let response = self.call_llm(&current_prompt).await?;
            let cleaned = response
                .trim()
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim();

            match serde_json::from_str::<ResolvedRequest>(cleaned) {
                Ok(resolved) => {
                    debug!(attempt, "resolved request from question");
                    return Ok(resolved);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "failed to parse resolved request");
                    last_error = e.to_string();
                    current_prompt = format!(
                        "{}\n\nRETRY ATTEMPT {}: The previous response was not valid JSON. \
                        Error: {}\nReturn ONLY valid JSON matching the documented structure, \
                        no markdown, no explanations.",
                        prompt, attempt, last_error
                    );
                }
            }
        }

        Err(EngineError::Llm(format!(
            "Failed to parse resolved request after 3 attempts: {}",
            last_error
        )))
    }

    fn build_prompt(&self, question: &str, profile: &DatasetProfile) -> String {
        let mut schema_info = String::new();
        schema_info.push_str("AVAILABLE COLUMNS:\n");
        for column in &profile.columns {
            let samples: Vec<String> = column
                .sample_values
                .iter()
                .map(|v| v.to_string())
                .collect();
            schema_info.push_str(&format!(
                "  - {} ({}) e.g. {}\n",
                column.name,
                column.semantic_type,
                samples.join(", ")
            ));
        }

        format!(
            r#"You are a data analysis request resolver. Convert the user's question into a JSON specification of statistics to compute and/or a chart to draw over the dataset described below.

USER QUESTION: "{}"

{}
DATASET ROWS: {}

OUTPUT FORMAT (JSON only, no markdown):
{{
  "operations": [
    {{
      "operation": "count|mean|median|sum|min|max|correlation",
      "field": "column name",
      "field2": "second column, correlation only",
      "group_by": "optional column to group by",
      "filters": [{{"field": "column", "operator": "==|!=|>|<|>=|<=", "value": "..."}}]
    }}
  ],
  "chart_spec": {{"mark": "...", "encoding": {{"x": {{"field": "...", "type": "..."}}}}}} or null,
  "description": "one-line description of the analysis"
}}

RULES:
- Only reference columns that exist in the dataset.
- Use "correlation" with both "field" and "field2" for relationship questions.
- Include "chart_spec" only when the question asks for a visualization.
- Return ONLY valid JSON."#,
            question, schema_info, profile.row_count
        )
    }

    pub async fn call_llm(&self, prompt: &str) -> Result<String> {
        // Canned response for offline runs with a dummy key.
        if self.api_key == "dummy-api-key" {
            return Ok(
                r#"{"operations": [], "chart_spec": null, "description": "No request resolved (offline mode)"}"#
                    .to_string(),
            );
        }

        let client = reqwest::Client::new();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": 1000
        });

        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("LLM API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EngineError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_request_accepts_camel_case_aliases() {
        let resolved: ResolvedRequest = serde_json::from_value(json!({
            "operations": [{"operation": "mean", "field": "MPG", "groupBy": "Origin"}],
            "chartSpec": {"mark": "bar", "encoding": {"x": {"field": "Origin"}}}
        }))
        .unwrap();
        assert_eq!(resolved.operations.len(), 1);
        assert_eq!(resolved.operations[0].group_by.as_deref(), Some("Origin"));
        assert!(resolved.chart_spec.is_some());
    }

    #[test]
    fn test_resolved_request_defaults() {
        let resolved: ResolvedRequest = serde_json::from_value(json!({})).unwrap();
        assert!(resolved.operations.is_empty());
        assert!(resolved.chart_spec.is_none());
        assert!(resolved.description.is_none());
    }
}
