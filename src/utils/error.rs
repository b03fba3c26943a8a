use thiserror::Error;

/// Failure taxonomy for the query pipeline. Callers branch on the variant to
/// pick fallback behavior, so connector and model failures are always mapped
/// into one of these instead of bubbling driver errors upward.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported data source type: {0}")]
    UnsupportedEngine(String),

    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Invalid query: {0}")]
    ValidationFailure(String),

    #[error("Query execution failed: {0}")]
    ExecutionFailure(String),

    #[error("AI service unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Could not extract SQL from model output: {0}")]
    ParseFailure(String),
}

impl CoreError {
    /// True for network-class failures of the text-generation backend. The
    /// translator checks this to decide whether the rule-based fallback applies.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, CoreError::ModelUnavailable(_))
    }
}
