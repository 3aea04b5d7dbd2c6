//! Error types for orchestration setup and the bundled adapters.

use terrapilot_core::{ConfigError, CoreError};
use thiserror::Error;

/// Errors raised while configuring or constructing orchestration components.
///
/// Failures inside a run are never surfaced through this type; they are
/// recorded on the step that hit them.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client construction or transport failure.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The inference endpoint answered with something unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AgentError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ConnectionError(_) | AgentError::Timeout(_)
        )
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            AgentError::Config(_) => "CONFIG_ERROR",
            AgentError::ConnectionError(_) => "CONNECTION_ERROR",
            AgentError::Timeout(_) => "TIMEOUT",
            AgentError::InvalidResponse(_) => "INVALID_RESPONSE",
            AgentError::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type for orchestration setup.
pub type AgentResult<T> = Result<T, AgentError>;

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout(err.to_string())
        } else if err.is_decode() {
            AgentError::InvalidResponse(err.to_string())
        } else {
            AgentError::ConnectionError(err.to_string())
        }
    }
}

impl From<AgentError> for CoreError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Timeout(message) => CoreError::Timeout(message),
            other => CoreError::Inference(other.to_string()),
        }
    }
}
