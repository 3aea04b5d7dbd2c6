//! Integration tests for the protocol handler
//!
//! Drive the handler through raw JSON strings the way a transport would and
//! check the wire-level replies.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use terrapilot_mcp::{
    Capability, FnCapability, McpError, McpResult, ProtocolHandler, ResourceDefinition,
    SchemaDescriptor, ServerInfo, StaticResource, ToolDefinition,
};

/// Capability counting its invocations
struct CountingTool {
    definition: ToolDefinition,
    calls: AtomicUsize,
}

impl CountingTool {
    fn new(name: &str) -> Self {
        Self {
            definition: ToolDefinition::new(
                name,
                "Adds a point entity",
                SchemaDescriptor::object()
                    .property("longitude", SchemaDescriptor::number(), true)
                    .property("latitude", SchemaDescriptor::number(), true)
                    .property("name", SchemaDescriptor::string(), false),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Capability for CountingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: Map<String, Value>) -> McpResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("point");
        Ok(json!({"id": format!("{name}-1")}))
    }
}

fn handler_with_tool() -> (ProtocolHandler, Arc<CountingTool>) {
    let handler = ProtocolHandler::new(ServerInfo::new("globe-test", "0.0.1"));
    let tool = Arc::new(CountingTool::new("addPoint"));
    handler.register_tool(tool.clone());
    (handler, tool)
}

async fn send(handler: &ProtocolHandler, raw: &str) -> Value {
    let reply = handler
        .handle_message(raw)
        .await
        .expect("request should produce a reply");
    serde_json::from_str(&reply).expect("reply should be valid JSON")
}

#[tokio::test]
async fn test_tools_list_reports_definitions() {
    let (handler, _) = handler_with_tool();
    let reply = send(&handler, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;

    assert_eq!(reply["jsonrpc"], "2.0");
    assert_eq!(reply["id"], 1);
    let tools = reply["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "addPoint");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
    assert_eq!(
        tools[0]["inputSchema"]["required"],
        json!(["longitude", "latitude"])
    );
}

#[tokio::test]
async fn test_tools_call_wraps_result_in_content_envelope() {
    let (handler, tool) = handler_with_tool();
    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":"call-1","method":"tools/call","params":{"name":"addPoint","arguments":{"longitude":2.35,"latitude":48.85,"name":"paris"}}}"#,
    )
    .await;

    assert_eq!(reply["id"], "call-1");
    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["content"][0]["type"], "text");
    assert_eq!(reply["result"]["content"][0]["text"], r#"{"id":"paris-1"}"#);
    assert!(reply["result"].get("isError").is_none());
    assert_eq!(tool.calls(), 1);
}

#[tokio::test]
async fn test_unregistered_tool_is_invalid_params() {
    let (handler, tool) = handler_with_tool();
    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"removeEverything"}}"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], -32602);
    assert!(reply.get("result").is_none());
    assert_eq!(tool.calls(), 0);
}

#[tokio::test]
async fn test_missing_tool_name_is_invalid_params() {
    let (handler, _) = handler_with_tool();
    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#,
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);

    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":[1,2]}"#,
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);
}

#[tokio::test]
async fn test_schema_violation_never_reaches_handler() {
    let (handler, tool) = handler_with_tool();
    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"addPoint","arguments":{"longitude":1}}}"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(tool.calls(), 0);
}

#[tokio::test]
async fn test_handler_failure_becomes_error_flagged_result() {
    let handler = ProtocolHandler::default();
    handler.register_tool(Arc::new(FnCapability::new(
        ToolDefinition::new("loadTileset", "Load a tileset", SchemaDescriptor::object()),
        |_args| async { Err(McpError::ToolExecutionFailed("tileset unavailable".to_string())) },
    )));

    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"loadTileset"}}"#,
    )
    .await;

    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], true);
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("tileset unavailable"));
}

#[tokio::test]
async fn test_handler_panic_becomes_error_flagged_result() {
    let handler = ProtocolHandler::default();
    handler.register_tool(Arc::new(FnCapability::new(
        ToolDefinition::new("explode", "Always panics", SchemaDescriptor::object()),
        |args| async move {
            if args.is_empty() {
                panic!("handler bug");
            }
            Ok(Value::Null)
        },
    )));

    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"explode"}}"#,
    )
    .await;

    assert_eq!(reply["result"]["isError"], true);
}

#[tokio::test]
async fn test_resources_list_and_read() {
    let handler = ProtocolHandler::default();
    handler.register_resource(
        ResourceDefinition::new("globe://camera", "Camera state")
            .with_description("Current camera position")
            .with_mime_type("application/json"),
        Arc::new(StaticResource::new(r#"{"height":1000}"#)),
    );

    let list = send(&handler, r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#).await;
    let resources = list["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["uri"], "globe://camera");
    assert_eq!(resources[0]["mimeType"], "application/json");

    let read = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":2,"method":"resources/read","params":{"uri":"globe://camera"}}"#,
    )
    .await;
    assert_eq!(
        read["result"],
        json!({"contents": [{
            "uri": "globe://camera",
            "mimeType": "application/json",
            "text": "{\"height\":1000}"
        }]})
    );
}

#[tokio::test]
async fn test_unregistered_resource_is_invalid_params() {
    let handler = ProtocolHandler::default();
    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":9,"method":"resources/read","params":{"uri":"globe://nowhere"}}"#,
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);
}

#[tokio::test]
async fn test_notification_has_side_effect_but_no_reply() {
    let handler = ProtocolHandler::default();
    assert!(!handler.is_ready());

    let reply = handler
        .handle_message(r#"{"jsonrpc":"2.0","method":"initialized"}"#)
        .await;

    assert!(reply.is_none());
    assert!(handler.is_ready());
}

#[tokio::test]
async fn test_notification_for_unknown_method_stays_silent() {
    let handler = ProtocolHandler::default();
    let reply = handler
        .handle_message(r#"{"jsonrpc":"2.0","method":"camera/shake"}"#)
        .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_unknown_method_is_method_not_found() {
    let handler = ProtocolHandler::default();
    let reply = send(&handler, r#"{"jsonrpc":"2.0","id":10,"method":"camera/shake"}"#).await;
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], 10);
}

#[tokio::test]
async fn test_malformed_messages() {
    let handler = ProtocolHandler::default();

    let reply = send(&handler, "{\"jsonrpc\":\"2.0\",").await;
    assert_eq!(reply["error"]["code"], -32700);
    assert_eq!(reply["id"], Value::Null);

    let reply = send(&handler, r#"{"jsonrpc":"1.0","id":11,"method":"ping"}"#).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["id"], Value::Null);

    let reply = send(&handler, r#"{"jsonrpc":"2.0","id":12}"#).await;
    assert_eq!(reply["error"]["code"], -32600);
}

#[tokio::test]
async fn test_incoming_responses_are_ignored() {
    let handler = ProtocolHandler::default();
    let reply = handler
        .handle_message(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
        .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_responses_with_server_defined_error_codes_are_ignored() {
    let handler = ProtocolHandler::default();

    for raw in [
        r#"{"jsonrpc":"2.0","id":5,"error":{"code":-32000,"message":"server busy"}}"#,
        r#"{"jsonrpc":"2.0","id":6,"error":{"code":4001,"message":"camera locked"}}"#,
        r#"{"jsonrpc":"2.0","id":7,"error":{"code":"busy"}}"#,
    ] {
        assert!(handler.handle_message(raw).await.is_none(), "answered {raw}");
    }
}

#[tokio::test]
async fn test_runtime_registration_is_visible_immediately() {
    let (handler, _) = handler_with_tool();
    assert!(handler.tools().unregister("addPoint"));

    let reply = send(
        &handler,
        r#"{"jsonrpc":"2.0","id":13,"method":"tools/call","params":{"name":"addPoint","arguments":{"longitude":0,"latitude":0}}}"#,
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);
}
