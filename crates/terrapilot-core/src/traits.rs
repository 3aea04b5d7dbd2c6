//! Adapter traits driven by the orchestrator.
//!
//! These traits define the seams between orchestration and its external
//! collaborators: the decomposer, the language model, and whatever executes
//! tool calls.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::call::ToolCall;
use crate::command::AtomicCommand;
use crate::error::CoreResult;
use crate::prompt::Prompt;

/// Splits one instruction into ordered atomic commands.
///
/// Ids must be unique within one call. Output need not be deterministic
/// across calls.
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(&self, instruction: &str) -> CoreResult<Vec<AtomicCommand>>;
}

/// Turns a step prompt into a structured tool call.
///
/// `Ok(None)` means the model answered but produced no usable call.
#[async_trait]
pub trait InferenceAdapter: Send + Sync {
    async fn infer(&self, prompt: &Prompt) -> CoreResult<Option<ToolCall>>;
}

/// Executes a tool call against the control surface.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> CoreResult<Value>;
}

#[async_trait]
impl<T: Decomposer + ?Sized> Decomposer for Arc<T> {
    async fn decompose(&self, instruction: &str) -> CoreResult<Vec<AtomicCommand>> {
        (**self).decompose(instruction).await
    }
}

#[async_trait]
impl<T: InferenceAdapter + ?Sized> InferenceAdapter for Arc<T> {
    async fn infer(&self, prompt: &Prompt) -> CoreResult<Option<ToolCall>> {
        (**self).infer(prompt).await
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        (**self).execute(call).await
    }
}
