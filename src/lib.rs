//! # Terrapilot
//!
//! Natural-language control of a 3D globe through structured tool calls.
//! One instruction is decomposed into atomic commands, each command is turned
//! into a tool call by a language model, and each call is executed against a
//! capability server speaking JSON-RPC.
//!
//! ## Core Components
//!
//! - **[Orchestrator]**: runs an instruction step by step, threading a
//!   [`CommandContext`] between steps
//! - **[ProtocolHandler]**: tool and resource registries behind the standard
//!   protocol methods
//! - **[WasmBridge]**: the same protocol served by a compiled module
//! - **[`extract_tool_call`]**: recovers tool calls from free-form model text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use terrapilot::{
//!     FnCapability, HttpInferenceAdapter, KeywordDecomposer, Orchestrator,
//!     OrchestratorConfig, ProtocolHandler, ProtocolToolExecutor, SchemaDescriptor,
//!     ToolDefinition,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = Arc::new(ProtocolHandler::default());
//! handler.register_tool(Arc::new(FnCapability::new(
//!     ToolDefinition::new(
//!         "flyTo",
//!         "Fly the camera to a location",
//!         SchemaDescriptor::object()
//!             .property("longitude", SchemaDescriptor::number().range(Some(-180.0), Some(180.0)), true)
//!             .property("latitude", SchemaDescriptor::number().range(Some(-90.0), Some(90.0)), true),
//!     ),
//!     |args| async move { Ok(json!({"arrived": true, "at": args})) },
//! )));
//!
//! let orchestrator = Orchestrator::new(
//!     KeywordDecomposer::new(),
//!     HttpInferenceAdapter::from_env()?,
//!     ProtocolToolExecutor::new(handler),
//! )
//! .with_config(OrchestratorConfig::from_env()?);
//!
//! let result = orchestrator.execute("fly to Paris then zoom in").await;
//! println!("{} of {} steps succeeded", result.succeeded_steps().count(), result.steps.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use terrapilot_agent as agent;
pub use terrapilot_bridge as bridge;
pub use terrapilot_core as core;
pub use terrapilot_mcp as mcp;
pub use terrapilot_observability as observability;

// ============================================================================
// Commonly used types
// ============================================================================

pub use terrapilot_core::{
    AtomicCommand, CapabilityKind, CommandId, CommandIntent, CoreError, CoreResult, Decomposer,
    GeoPoint, InferenceAdapter, Prompt, ToolCall, ToolExecutor,
};

pub use terrapilot_agent::{
    CommandContext, HttpInferenceAdapter, InferenceConfig, KeywordDecomposer,
    OrchestrationResult, Orchestrator, OrchestratorConfig, PromptBuilder, ProtocolToolExecutor,
    StepResult, extract_all_tool_calls, extract_tool_call,
};

pub use terrapilot_mcp::{
    Capability, FnCapability, McpError, ProtocolHandler, ResourceDefinition, SchemaDescriptor,
    StaticResource, ToolDefinition, serve_stdio,
};

pub use terrapilot_bridge::{BridgeConfig, BridgeError, WasmBridge, WasmtimeModule};

pub use terrapilot_observability::{ObservabilityConfig, init_tracing};
