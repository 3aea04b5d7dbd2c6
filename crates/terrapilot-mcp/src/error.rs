//! Protocol error types
//!
//! Every protocol failure maps onto one of the fixed JSON-RPC error codes so
//! it can be returned to the peer instead of thrown across the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jsonrpc::RpcError;

/// Protocol operation result type
pub type McpResult<T> = Result<T, McpError>;

/// Fixed JSON-RPC error codes.
///
/// The integer values are part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            _ => None,
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ErrorCode::from_code(value).ok_or_else(|| format!("unknown JSON-RPC error code {value}"))
    }
}

/// Errors that can occur while handling protocol messages
#[derive(Debug, Error)]
pub enum McpError {
    /// Message was not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Message was JSON but not a valid request or response
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid method parameters
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    /// Resource reader failed
    #[error("Resource read failed: {0}")]
    ResourceReadFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl McpError {
    /// The wire error code this error is reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            McpError::ParseError(_) => ErrorCode::ParseError,
            McpError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            McpError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            McpError::InvalidParams(_)
            | McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_) => ErrorCode::InvalidParams,
            McpError::ToolExecutionFailed(_)
            | McpError::ResourceReadFailed(_)
            | McpError::SerializationError(_)
            | McpError::IoError(_)
            | McpError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            McpError::ParseError(_) => "PARSE_ERROR",
            McpError::InvalidRequest(_) => "INVALID_REQUEST",
            McpError::MethodNotFound(_) => "METHOD_NOT_FOUND",
            McpError::InvalidParams(_) => "INVALID_PARAMS",
            McpError::ToolNotFound(_) => "TOOL_NOT_FOUND",
            McpError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            McpError::ToolExecutionFailed(_) => "TOOL_EXECUTION_FAILED",
            McpError::ResourceReadFailed(_) => "RESOURCE_READ_FAILED",
            McpError::SerializationError(_) => "SERIALIZATION_ERROR",
            McpError::IoError(_) => "IO_ERROR",
            McpError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert into the wire error object.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::new(self.code(), self.to_string())
    }

    /// Check if the peer may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, McpError::IoError(_) | McpError::ResourceReadFailed(_))
    }
}

impl From<McpError> for RpcError {
    fn from(err: McpError) -> Self {
        err.to_rpc_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_wire_contract() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::from_code(-32602), Some(ErrorCode::InvalidParams));
        assert_eq!(ErrorCode::from_code(42), None);
    }

    #[test]
    fn lookup_failures_are_invalid_params() {
        assert_eq!(
            McpError::ToolNotFound("nope".to_string()).code(),
            ErrorCode::InvalidParams
        );
        assert_eq!(
            McpError::ResourceNotFound("x://y".to_string()).code(),
            ErrorCode::InvalidParams
        );
    }

    #[test]
    fn rpc_error_carries_message() {
        let rpc = McpError::MethodNotFound("foo/bar".to_string()).to_rpc_error();
        assert_eq!(rpc.code, -32601);
        assert_eq!(rpc.kind(), Some(ErrorCode::MethodNotFound));
        assert_eq!(rpc.message, "Method not found: foo/bar");
        assert!(rpc.data.is_none());
    }

    #[test]
    fn error_code_serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::InvalidParams).unwrap();
        assert_eq!(json, "-32602");
        let back: ErrorCode = serde_json::from_str("-32601").unwrap();
        assert_eq!(back, ErrorCode::MethodNotFound);
    }
}
