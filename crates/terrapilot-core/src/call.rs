//! Structured tool calls and capability classification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to invoke one named capability with keyword arguments.
///
/// Produced by the tool-call extractor or directly by an inference adapter,
/// and consumed by a [`ToolExecutor`](crate::ToolExecutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a call with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Create a call from a name and a JSON value.
    ///
    /// Non-object argument values are ignored and produce an empty map.
    pub fn with_arguments(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Builder-style argument insertion.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Numeric argument, accepting JSON numbers only.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.arguments.get(key).and_then(Value::as_f64)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Arguments as a JSON object value.
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }

    /// How the orchestrator should treat a successful result of this call.
    pub fn kind(&self) -> CapabilityKind {
        CapabilityKind::classify(&self.name)
    }
}

/// Coarse classification of a capability by its name.
///
/// Drives which parts of the run context a successful call updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// Adds something to the scene; its result carries an entity id.
    Creation,
    /// Moves the camera; its arguments carry a location.
    Navigation,
    /// Looks things up; a list result becomes the last search results.
    Lookup,
    Other,
}

const CREATION_PREFIXES: &[&str] = &["add", "create", "load", "spawn"];
const NAVIGATION_PREFIXES: &[&str] = &["flyto", "lookat", "setview", "zoom", "navigate", "goto"];
const LOOKUP_MARKERS: &[&str] = &["search", "find", "list", "resolve", "lookup"];

impl CapabilityKind {
    /// Classify a capability name, case-insensitively.
    ///
    /// Creation and navigation are prefix matches; lookup is a substring match
    /// checked last, so `addPointAtLocation` stays a creation.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if CREATION_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            CapabilityKind::Creation
        } else if NAVIGATION_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            CapabilityKind::Navigation
        } else if LOOKUP_MARKERS.iter().any(|m| lower.contains(m)) {
            CapabilityKind::Lookup
        } else {
            CapabilityKind::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_capability_names() {
        assert_eq!(CapabilityKind::classify("addSphere"), CapabilityKind::Creation);
        assert_eq!(
            CapabilityKind::classify("addPointAtLocation"),
            CapabilityKind::Creation
        );
        assert_eq!(CapabilityKind::classify("loadTileset"), CapabilityKind::Creation);
        assert_eq!(CapabilityKind::classify("flyTo"), CapabilityKind::Navigation);
        assert_eq!(
            CapabilityKind::classify("flyToLocation"),
            CapabilityKind::Navigation
        );
        assert_eq!(CapabilityKind::classify("zoom"), CapabilityKind::Navigation);
        assert_eq!(CapabilityKind::classify("searchPlaces"), CapabilityKind::Lookup);
        assert_eq!(CapabilityKind::classify("listLocations"), CapabilityKind::Lookup);
        assert_eq!(CapabilityKind::classify("removeEntity"), CapabilityKind::Other);
    }

    #[test]
    fn non_object_arguments_become_empty() {
        let call = ToolCall::with_arguments("clearAll", json!([1, 2]));
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn typed_argument_accessors() {
        let call = ToolCall::new("flyTo")
            .arg("longitude", 2.35)
            .arg("latitude", 48.85)
            .arg("label", "Paris");

        assert_eq!(call.number("longitude"), Some(2.35));
        assert_eq!(call.string("label"), Some("Paris"));
        assert_eq!(call.number("label"), None);
        assert_eq!(call.arguments_value()["latitude"], json!(48.85));
    }

    #[test]
    fn deserialize_without_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"name":"clearAll"}"#).unwrap();
        assert_eq!(call.name, "clearAll");
        assert!(call.arguments.is_empty());
    }
}
