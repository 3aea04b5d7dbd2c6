//! # Terrapilot Agent - Command Orchestration
//!
//! Turns one natural-language instruction into a sequence of executed tool
//! calls:
//!
//! 1. a [`Decomposer`](terrapilot_core::Decomposer) splits the instruction
//!    into atomic commands with dependencies
//! 2. the [`Orchestrator`] walks them in order, building a prompt per step
//!    from the [`CommandContext`]
//! 3. an [`InferenceAdapter`](terrapilot_core::InferenceAdapter) turns the
//!    prompt into a tool call
//! 4. a [`ToolExecutor`](terrapilot_core::ToolExecutor) runs it, and the
//!    result is folded back into the context
//!
//! Bundled adapters: [`KeywordDecomposer`], [`HttpInferenceAdapter`] and
//! [`ProtocolToolExecutor`]. The [`extractor`] module recovers tool calls
//! from free-form model text.

pub mod config;
pub mod context;
pub mod decomposer;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod inference;
pub mod orchestrator;
pub mod prompt;

pub use config::{InferenceConfig, OrchestratorConfig, OrchestratorConfigBuilder};
pub use context::CommandContext;
pub use decomposer::KeywordDecomposer;
pub use error::{AgentError, AgentResult};
pub use executor::ProtocolToolExecutor;
pub use extractor::{extract_all_tool_calls, extract_tool_call};
pub use inference::HttpInferenceAdapter;
pub use orchestrator::{
    DEPENDENCIES_NOT_SATISFIED, NO_TOOL_CALL, OrchestrationResult, Orchestrator, StepResult,
};
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
