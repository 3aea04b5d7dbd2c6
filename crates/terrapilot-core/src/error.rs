//! Error types shared by the adapter seams.

use thiserror::Error;

/// Errors raised by decomposers, inference adapters and tool executors.
///
/// The orchestrator never propagates these out of a run; they are recorded
/// on the failing step and the run continues.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The decomposer could not split the instruction.
    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    /// The inference adapter failed to produce a response.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The tool executor rejected or failed the call.
    #[error("{0}")]
    ToolExecution(String),

    /// A tool call did not have the expected shape.
    #[error("Invalid tool call: {0}")]
    InvalidToolCall(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Adapter timed out.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl CoreError {
    /// Create a tool execution failure from any displayable error.
    pub fn tool(message: impl Into<String>) -> Self {
        CoreError::ToolExecution(message.into())
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Inference(_) | CoreError::Timeout(_))
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Decomposition(_) => "DECOMPOSITION_FAILED",
            CoreError::Inference(_) => "INFERENCE_FAILED",
            CoreError::ToolExecution(_) => "TOOL_EXECUTION_FAILED",
            CoreError::InvalidToolCall(_) => "INVALID_TOOL_CALL",
            CoreError::Serialization(_) => "SERIALIZATION_ERROR",
            CoreError::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Result type for adapter operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}
