//! Bridge error types

use terrapilot_core::{ConfigError, CoreError};
use thiserror::Error;

/// Bridge operation result type
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while loading or calling into a compiled module
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A call was made before a module was loaded
    #[error("Module not loaded")]
    NotLoaded,

    /// Compiling, instantiating or initialising the module failed
    #[error("Failed to load module: {0}")]
    LoadFailed(String),

    /// An otherwise successful call returned a null pointer
    #[error("{operation} returned a null pointer")]
    NullPointer { operation: String },

    /// The module does not export a required function or memory
    #[error("Missing export: {0}")]
    MissingExport(String),

    /// The module trapped
    #[error("Module trapped: {0}")]
    Trap(String),

    /// A read or write fell outside linear memory
    #[error("Memory access out of bounds: {len} bytes at {ptr:#x}")]
    MemoryAccess { ptr: u32, len: usize },

    /// A string in linear memory was not valid
    #[error("Invalid string: {0}")]
    InvalidString(String),

    /// The module reused a callback id that is still pending
    #[error("Callback id {0} is already pending")]
    CallbackIdReused(u32),

    /// A result arrived for a callback id nobody is waiting on
    #[error("Unknown callback id {0}")]
    UnknownCallback(u32),

    /// A second result arrived for a callback id
    #[error("Callback id {0} was already settled")]
    CallbackAlreadySettled(u32),

    /// The module called its `abort` import
    #[error("Module aborted: {0}")]
    ModuleAbort(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::NotLoaded => "NOT_LOADED",
            BridgeError::LoadFailed(_) => "LOAD_FAILED",
            BridgeError::NullPointer { .. } => "NULL_POINTER",
            BridgeError::MissingExport(_) => "MISSING_EXPORT",
            BridgeError::Trap(_) => "MODULE_TRAP",
            BridgeError::MemoryAccess { .. } => "MEMORY_ACCESS",
            BridgeError::InvalidString(_) => "INVALID_STRING",
            BridgeError::CallbackIdReused(_) => "CALLBACK_ID_REUSED",
            BridgeError::UnknownCallback(_) => "UNKNOWN_CALLBACK",
            BridgeError::CallbackAlreadySettled(_) => "CALLBACK_ALREADY_SETTLED",
            BridgeError::ModuleAbort(_) => "MODULE_ABORT",
            BridgeError::Config(_) => "CONFIG_ERROR",
            BridgeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Broken bridge invariants, as opposed to failures of one call.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::NotLoaded
                | BridgeError::CallbackIdReused(_)
                | BridgeError::UnknownCallback(_)
                | BridgeError::CallbackAlreadySettled(_)
        )
    }
}

impl From<BridgeError> for CoreError {
    fn from(err: BridgeError) -> Self {
        CoreError::ToolExecution(err.to_string())
    }
}
