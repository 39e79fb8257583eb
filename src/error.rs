use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Field '{field}' not found. Available fields: {}", .available.join(", "))]
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    #[error("No valid data for field '{field}': {detail}")]
    NoValidData { field: String, detail: String },

    #[error("Response carries neither a chart spec nor a statistic output")]
    InvalidResponseShape,

    #[error("Invalid chart spec: {}", .issues.join("; "))]
    InvalidChartSpec { issues: Vec<String> },

    #[error("Unrecognized operation: {0}")]
    InvalidOperation(String),

    #[error("Row {row} does not match the dataset schema: {detail}")]
    SchemaMismatch { row: usize, detail: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Transport-facing rendition of a failure: a message plus a structured
/// issue list, so the HTTP layer can map it to its own error convention.
#[derive(Debug, Clone, Serialize)]
pub struct FailurePayload {
    pub success: bool,
    pub output: String,
    pub issues: Vec<String>,
}

impl EngineError {
    pub fn to_failure(&self) -> FailurePayload {
        let issues = match self {
            EngineError::InvalidChartSpec { issues } => issues.clone(),
            EngineError::FieldNotFound { available, .. } => available.clone(),
            _ => Vec::new(),
        };
        FailurePayload {
            success: false,
            output: self.to_string(),
            issues,
        }
    }
}
