//! Error types for the debate system.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebateError {
    /// Malformed input to an operation.
    #[error("Invalid input field `{field}`: {reason}")]
    ValidationError { field: String, reason: String },

    /// The model provider call failed or timed out.
    #[error("Model provider error: {0}")]
    ModelError(String),

    /// The provider answered, but the payload does not match the output schema.
    #[error("Model response does not match schema at `{field}`: {reason}")]
    SchemaMismatchError { field: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl DebateError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DebateError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DebateError::SchemaMismatchError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether a session can keep going after this error.
    ///
    /// Only configuration problems are fatal; they surface at start-up.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DebateError::ConfigError(_))
    }

    /// Short heading used when the error is shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            DebateError::ValidationError { .. } => "Invalid input",
            DebateError::ModelError(_) => "Model unavailable",
            DebateError::SchemaMismatchError { .. } => "Unexpected model response",
            DebateError::ConfigError(_) => "Configuration problem",
            DebateError::Cancelled => "Cancelled",
        }
    }
}

impl From<async_openai::error::OpenAIError> for DebateError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        DebateError::ModelError(err.to_string())
    }
}
