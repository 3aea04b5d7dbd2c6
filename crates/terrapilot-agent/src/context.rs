//! Run-scoped state threaded between orchestration steps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use terrapilot_core::{CapabilityKind, CommandId, GeoPoint, ToolCall};

/// Mutable state for one orchestration run.
///
/// Created empty per run and only ever extended by successful steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandContext {
    /// Raw result of every successful step, keyed by command id.
    pub previous_results: BTreeMap<CommandId, Value>,
    /// Entity id produced by each successful creation step.
    pub created_entities: BTreeMap<CommandId, String>,
    /// Location of the last navigation that named one.
    pub current_location: Option<GeoPoint>,
    /// List result of the last lookup step.
    pub search_results: Option<Vec<Value>>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.previous_results.is_empty()
            && self.created_entities.is_empty()
            && self.current_location.is_none()
            && self.search_results.is_none()
    }

    /// Fold a successful step into the context.
    ///
    /// The raw result is always recorded. Creation steps add an entity id,
    /// navigation steps carrying both coordinates replace the current
    /// location, and lookup steps with a list result replace the search
    /// results.
    pub fn record_success(&mut self, command_id: &CommandId, call: &ToolCall, result: &Value) {
        self.previous_results
            .insert(command_id.clone(), result.clone());

        match call.kind() {
            CapabilityKind::Creation => {
                let entity_id = entity_id_from_result(result)
                    .or_else(|| call.string("name").map(str::to_string))
                    .unwrap_or_else(|| format!("entity_{command_id}"));
                self.created_entities.insert(command_id.clone(), entity_id);
            }
            CapabilityKind::Navigation => {
                if let Some(point) = GeoPoint::from_arguments(&call.arguments) {
                    self.current_location = Some(point);
                }
            }
            CapabilityKind::Lookup => {
                if let Value::Array(items) = result {
                    self.search_results = Some(items.clone());
                }
            }
            CapabilityKind::Other => {}
        }
    }
}

fn entity_id_from_result(result: &Value) -> Option<String> {
    match result.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
