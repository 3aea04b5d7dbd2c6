//! Protocol handler: one entry point from raw message to optional reply.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use terrapilot_core::config::{EnvSource, ProcessEnv, get_env_string};
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};
use crate::jsonrpc::{Message, Response, parse_message};
use crate::registry::{
    Capability, ResourceDefinition, ResourceReader, ResourceRegistry, ToolRegistry,
};

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server identity reported by `initialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "terrapilot".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Read `TERRAPILOT_SERVER_NAME` / `TERRAPILOT_SERVER_VERSION`, falling
    /// back to the defaults for unset or blank values.
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Self {
        let defaults = Self::default();
        Self {
            name: get_env_string(source, "TERRAPILOT_SERVER_NAME").unwrap_or(defaults.name),
            version: get_env_string(source, "TERRAPILOT_SERVER_VERSION")
                .unwrap_or(defaults.version),
        }
    }
}

/// One item of a tool result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result envelope of `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// Wrap a handler value; strings are used as-is, anything else is
    /// serialized as JSON text.
    pub fn success(value: &Value) -> Self {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            content: vec![Content::Text { text }],
            is_error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Concatenated text of all content items
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wraps the registries and server identity behind a single message entry
/// point.
pub struct ProtocolHandler {
    tools: ToolRegistry,
    resources: ResourceRegistry,
    server_info: ServerInfo,
    ready: AtomicBool,
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new(ServerInfo::default())
    }
}

impl ProtocolHandler {
    pub fn new(server_info: ServerInfo) -> Self {
        Self {
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
            server_info,
            ready: AtomicBool::new(false),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn register_tool(&self, capability: Arc<dyn Capability>) -> bool {
        self.tools.register(capability)
    }

    pub fn register_resource(
        &self,
        definition: ResourceDefinition,
        reader: Arc<dyn ResourceReader>,
    ) -> bool {
        self.resources.register(definition, reader)
    }

    /// Whether the peer has sent `initialized`.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Handle one raw message and return the serialized reply, if any.
    ///
    /// Notifications and responses never produce a reply.
    pub async fn handle_message(&self, raw: &str) -> Option<String> {
        let response = match parse_message(raw) {
            Ok(message) => self.handle(message).await?,
            Err(rejected) => {
                warn!(
                    code = rejected.error.code,
                    error = %rejected.error.message,
                    "Rejected incoming message"
                );
                rejected.into_response()
            }
        };

        match serde_json::to_string(&response) {
            Ok(serialized) => Some(serialized),
            Err(e) => {
                warn!(error = %e, "Failed to serialize response");
                None
            }
        }
    }

    /// Handle a parsed message.
    pub async fn handle(&self, message: Message) -> Option<Response> {
        let request = match message {
            Message::Request(request) => request,
            Message::Response(response) => {
                debug!(id = ?response.id, "Ignoring response message");
                return None;
            }
        };

        let outcome = self.dispatch(&request.method, request.params).await;
        let id = request.id?;

        Some(match outcome {
            Ok(result) => Response::success(Some(id), result),
            Err(e) => Response::failure(Some(id), e.to_rpc_error()),
        })
    }

    /// Run a method and produce its result value.
    pub async fn dispatch(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        debug!(method = %method, "Dispatching request");

        match method {
            "initialize" => Ok(self.initialize_result()),
            "initialized" | "notifications/initialized" => {
                self.ready.store(true, Ordering::Release);
                Ok(json!({}))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list() })),
            "tools/call" => {
                let params = object_params(params)?;
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::InvalidParams("missing tool name".to_string()))?;
                let arguments = match params.get("arguments") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(arguments)) => arguments.clone(),
                    Some(_) => {
                        return Err(McpError::InvalidParams(
                            "arguments must be an object".to_string(),
                        ));
                    }
                };
                let result = self.call_tool(name, arguments).await?;
                Ok(serde_json::to_value(result)?)
            }
            "resources/list" => Ok(json!({ "resources": self.resources.list() })),
            "resources/read" => {
                let params = object_params(params)?;
                let uri = params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::InvalidParams("missing resource uri".to_string()))?;
                self.read_resource(uri).await
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    /// Invoke a registered tool.
    ///
    /// Unknown tools and arguments failing validation are errors; a failing
    /// or panicking handler yields an error-flagged result instead.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        let capability = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        capability.validate(&arguments)?;

        debug!(tool = %name, "Calling tool");
        let outcome = AssertUnwindSafe(capability.execute(arguments))
            .catch_unwind()
            .await;

        Ok(match outcome {
            Ok(Ok(value)) => {
                debug!(tool = %name, "Tool execution completed");
                CallToolResult::success(&value)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                CallToolResult::failure(e.to_string())
            }
            Err(_) => {
                warn!(tool = %name, "Tool handler panicked");
                CallToolResult::failure(format!("Tool '{name}' panicked"))
            }
        })
    }

    /// Read a registered resource into a contents envelope.
    pub async fn read_resource(&self, uri: &str) -> McpResult<Value> {
        let (definition, reader) = self
            .resources
            .get(uri)
            .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;
        let text = reader.read(uri).await.map_err(|e| {
            warn!(uri = %uri, error = %e, "Resource read failed");
            e
        })?;

        let mut item = Map::new();
        item.insert("uri".to_string(), Value::String(definition.uri));
        if let Some(mime_type) = definition.mime_type {
            item.insert("mimeType".to_string(), Value::String(mime_type));
        }
        item.insert("text".to_string(), Value::String(text));
        Ok(json!({ "contents": [Value::Object(item)] }))
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": self.server_info.name,
                "version": self.server_info.version
            }
        })
    }
}

fn object_params(params: Option<Value>) -> McpResult<Map<String, Value>> {
    match params {
        Some(Value::Object(params)) => Ok(params),
        Some(_) => Err(McpError::InvalidParams("params must be an object".to_string())),
        None => Err(McpError::InvalidParams("missing params".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn server_info_reads_overrides() {
        let env: HashMap<&str, &str> =
            [("TERRAPILOT_SERVER_NAME", "globe-control")].into_iter().collect();
        let info = ServerInfo::from_source(&env);
        assert_eq!(info.name, "globe-control");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn call_result_envelope_shape() {
        let ok = serde_json::to_value(CallToolResult::success(&json!({"id": "p1"}))).unwrap();
        assert_eq!(ok, json!({"content": [{"type": "text", "text": "{\"id\":\"p1\"}"}]}));

        let failed = serde_json::to_value(CallToolResult::failure("boom")).unwrap();
        assert_eq!(
            failed,
            json!({"content": [{"type": "text", "text": "boom"}], "isError": true})
        );
    }

    #[tokio::test]
    async fn initialize_reports_protocol_version() {
        let handler = ProtocolHandler::new(ServerInfo::new("test", "1.0.0"));
        let result = handler.dispatch("initialize", None).await.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn ping_and_unknown_method() {
        let handler = ProtocolHandler::default();
        assert_eq!(handler.dispatch("ping", None).await.unwrap(), json!({}));
        let err = handler.dispatch("camera/shake", None).await.unwrap_err();
        assert!(matches!(err, McpError::MethodNotFound(ref m) if m == "camera/shake"));
    }
}
