//! Tool execution through the protocol core.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use terrapilot_core::{CoreError, CoreResult, ToolCall, ToolExecutor};
use terrapilot_mcp::{CallToolResult, Message, ProtocolHandler, Request};
use tracing::debug;

/// Executes tool calls as `tools/call` requests against a [`ProtocolHandler`].
///
/// JSON-RPC errors and error-flagged results both become
/// [`CoreError::ToolExecution`]. Text content that parses as JSON is returned
/// as that value; anything else is returned as a string.
pub struct ProtocolToolExecutor {
    handler: Arc<ProtocolHandler>,
    next_id: AtomicI64,
}

impl ProtocolToolExecutor {
    pub fn new(handler: Arc<ProtocolHandler>) -> Self {
        Self {
            handler,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn handler(&self) -> &Arc<ProtocolHandler> {
        &self.handler
    }
}

#[async_trait]
impl ToolExecutor for ProtocolToolExecutor {
    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(
            id,
            "tools/call",
            Some(json!({
                "name": call.name,
                "arguments": call.arguments_value(),
            })),
        );

        debug!(tool = %call.name, request_id = id, "Routing tool call through protocol handler");

        let response = self
            .handler
            .handle(Message::Request(request))
            .await
            .ok_or_else(|| CoreError::tool("Protocol handler returned no response"))?;

        if let Some(error) = response.error {
            return Err(CoreError::tool(error.message));
        }

        let result: CallToolResult =
            serde_json::from_value(response.result.unwrap_or(Value::Null))
                .map_err(|e| CoreError::tool(format!("Malformed tool result: {e}")))?;

        let text = result.text();
        if result.is_error() {
            return Err(CoreError::tool(text));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrapilot_mcp::{FnCapability, McpError, SchemaDescriptor, ToolDefinition};

    fn executor() -> ProtocolToolExecutor {
        let handler = ProtocolHandler::default();
        handler.register_tool(Arc::new(FnCapability::new(
            ToolDefinition::new("addPoint", "Add a point", SchemaDescriptor::object()),
            |arguments| async move {
                Ok(json!({"id": arguments.get("name").cloned().unwrap_or(json!("p"))}))
            },
        )));
        handler.register_tool(Arc::new(FnCapability::new(
            ToolDefinition::new("describe", "Plain text", SchemaDescriptor::object()),
            |_| async { Ok(json!("a plain sentence")) },
        )));
        handler.register_tool(Arc::new(FnCapability::new(
            ToolDefinition::new("removeAll", "Fails", SchemaDescriptor::object()),
            |_| async { Err(McpError::ToolExecutionFailed("scene locked".to_string())) },
        )));
        ProtocolToolExecutor::new(Arc::new(handler))
    }

    #[tokio::test]
    async fn json_text_is_unwrapped() {
        let result = executor()
            .execute(&ToolCall::new("addPoint").arg("name", "Tower"))
            .await
            .unwrap();
        assert_eq!(result, json!({"id": "Tower"}));
    }

    #[tokio::test]
    async fn plain_text_stays_a_string() {
        let result = executor().execute(&ToolCall::new("describe")).await.unwrap();
        assert_eq!(result, json!("a plain sentence"));
    }

    #[tokio::test]
    async fn error_flagged_result_fails() {
        let err = executor()
            .execute(&ToolCall::new("removeAll"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ToolExecution(ref m) if m.contains("scene locked")));
    }

    #[tokio::test]
    async fn unknown_tool_fails() {
        let err = executor()
            .execute(&ToolCall::new("teleport"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: teleport");
    }
}
