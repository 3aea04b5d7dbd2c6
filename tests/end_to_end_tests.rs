//! Full runs: keyword decomposition, scripted inference, and real protocol dispatch

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use terrapilot::agent::DEPENDENCIES_NOT_SATISFIED;
use terrapilot::mcp::McpResult;
use terrapilot::{
    Capability, CommandId, FnCapability, GeoPoint, KeywordDecomposer, Orchestrator,
    ProtocolHandler, ProtocolToolExecutor, SchemaDescriptor, ToolCall, ToolDefinition,
};
use terrapilot_testing::MockInference;

/// Hands out sequential point ids.
struct PointLayer {
    definition: ToolDefinition,
    created: AtomicUsize,
}

impl PointLayer {
    fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                "addPoint",
                "Add a point marker",
                SchemaDescriptor::object()
                    .property("name", SchemaDescriptor::string(), false)
                    .property("longitude", coordinate(180.0), true)
                    .property("latitude", coordinate(90.0), true),
            ),
            created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Capability for PointLayer {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _arguments: Map<String, Value>) -> McpResult<Value> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({"id": format!("point-{n}")}))
    }
}

fn coordinate(bound: f64) -> SchemaDescriptor {
    SchemaDescriptor::number().range(Some(-bound), Some(bound))
}

fn globe() -> Arc<ProtocolHandler> {
    let handler = Arc::new(ProtocolHandler::default());
    handler.register_tool(Arc::new(FnCapability::new(
        ToolDefinition::new(
            "flyTo",
            "Fly the camera",
            SchemaDescriptor::object()
                .property("longitude", coordinate(180.0), true)
                .property("latitude", coordinate(90.0), true),
        ),
        |_| async { Ok(json!({"arrived": true})) },
    )));
    handler.register_tool(Arc::new(FnCapability::new(
        ToolDefinition::new(
            "searchLocation",
            "Find places by name",
            SchemaDescriptor::object().property("query", SchemaDescriptor::string(), true),
        ),
        |args| async move {
            let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
            Ok(json!([{"name": query, "longitude": 2.2945, "latitude": 48.8584}]))
        },
    )));
    handler.register_tool(Arc::new(FnCapability::new(
        ToolDefinition::new("removeAll", "Clear every entity", SchemaDescriptor::object()),
        |args| async move {
            if args.is_empty() {
                panic!("layer store unavailable");
            }
            Ok(Value::Null)
        },
    )));
    handler.register_tool(Arc::new(PointLayer::new()));
    handler
}

fn fly_to(longitude: f64, latitude: f64) -> ToolCall {
    ToolCall::new("flyTo")
        .arg("longitude", longitude)
        .arg("latitude", latitude)
}

fn orchestrator(
    inference: MockInference,
) -> Orchestrator<KeywordDecomposer, MockInference, ProtocolToolExecutor> {
    Orchestrator::new(
        KeywordDecomposer::new(),
        inference,
        ProtocolToolExecutor::new(globe()),
    )
}

#[tokio::test]
async fn test_search_fly_and_mark() {
    let inference = MockInference::with_calls([
        ToolCall::new("searchLocation").arg("query", "Eiffel Tower"),
        fly_to(2.2945, 48.8584),
        ToolCall::new("addPoint")
            .arg("name", "Tower")
            .arg("longitude", 2.2945)
            .arg("latitude", 48.8584),
    ]);

    let result = orchestrator(inference.clone())
        .execute("find the Eiffel Tower, then fly there and then add a marker there")
        .await;

    assert!(result.success);
    assert!(result.is_complete());
    assert_eq!(result.decomposition.len(), 3);
    assert!(result.decomposition[2].dependencies.contains(&CommandId::new("cmd_2")));
    assert_eq!(result.succeeded_steps().count(), 3);

    let context = &result.context;
    assert_eq!(context.search_results.as_ref().map(Vec::len), Some(1));
    assert_eq!(context.current_location, Some(GeoPoint::new(2.2945, 48.8584)));
    assert_eq!(context.created_entities[&CommandId::new("cmd_3")], "point-1");
    assert_eq!(
        context.previous_results[&CommandId::new("cmd_2")],
        json!({"arrived": true})
    );

    let prompts = inference.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].user.contains("Current location"));
}

#[tokio::test]
async fn test_schema_violation_fails_step_and_dependents() {
    let inference = MockInference::with_calls([fly_to(0.0, 200.0)]);

    let result = orchestrator(inference.clone())
        .execute("fly to the north pole then zoom in there")
        .await;

    assert!(!result.success);
    let first = &result.steps[0];
    assert!(!first.success);
    let error = first.error.as_deref().unwrap_or_default();
    assert!(error.contains("latitude"), "unexpected error: {error}");
    assert!(result.context.current_location.is_none());

    assert_eq!(result.steps[1].error.as_deref(), Some(DEPENDENCIES_NOT_SATISFIED));
    assert_eq!(inference.call_count(), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_a_step_failure() {
    let inference = MockInference::with_calls([ToolCall::new("teleport").arg("to", "Tokyo")]);

    let result = orchestrator(inference).execute("show me Tokyo").await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    let error = result.steps[0].error.as_deref().unwrap_or_default();
    assert!(error.contains("Tool not found: teleport"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_panicking_tool_does_not_stop_independent_steps() {
    let inference = MockInference::with_calls([ToolCall::new("removeAll"), fly_to(2.35, 48.85)]);

    let result = orchestrator(inference)
        .execute("clear the map then fly to Paris")
        .await;

    assert!(result.success);
    assert_eq!(result.failed_steps().count(), 1);
    let error = result.steps[0].error.as_deref().unwrap_or_default();
    assert!(error.contains("panicked"), "unexpected error: {error}");
    assert_eq!(result.context.current_location, Some(GeoPoint::new(2.35, 48.85)));
}

#[tokio::test]
async fn test_created_ids_come_from_the_capability() {
    let point = |lon: f64| {
        ToolCall::new("addPoint")
            .arg("longitude", lon)
            .arg("latitude", 10.0)
    };
    let inference = MockInference::with_calls([point(1.0), point(2.0)]);

    let result = orchestrator(inference)
        .execute("add a point at the coast; place another one inland")
        .await;

    assert!(result.success);
    let ids: Vec<&String> = result.context.created_entities.values().collect();
    assert_eq!(ids, vec!["point-1", "point-2"]);
}
