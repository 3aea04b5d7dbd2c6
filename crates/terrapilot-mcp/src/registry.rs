//! Tool and resource registries
//!
//! Both registries are keyed by a primary key (tool name, resource URI),
//! keep registration order for listings, and let the last registration win.
//! Lookups hand out `Arc` clones so a handler can run without holding the
//! registry lock.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{McpError, McpResult};
use crate::schema::SchemaDescriptor;

/// Tool definition as reported by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: SchemaDescriptor,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: SchemaDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A named operation invocable through `tools/call`.
#[async_trait]
pub trait Capability: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Reject arguments the capability cannot run with.
    ///
    /// The default checks the definition's input schema.
    fn validate(&self, arguments: &Map<String, Value>) -> McpResult<()> {
        self.definition()
            .input_schema
            .validate_arguments(arguments)
            .map_err(McpError::InvalidParams)
    }

    async fn execute(&self, arguments: Map<String, Value>) -> McpResult<Value>;
}

type CapabilityFn = dyn Fn(Map<String, Value>) -> BoxFuture<'static, McpResult<Value>> + Send + Sync;

/// Capability backed by a closure.
pub struct FnCapability {
    definition: ToolDefinition,
    handler: Box<CapabilityFn>,
}

impl FnCapability {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<Value>> + Send + 'static,
    {
        Self {
            definition,
            handler: Box::new(move |arguments| Box::pin(handler(arguments))),
        }
    }
}

#[async_trait]
impl Capability for FnCapability {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: Map<String, Value>) -> McpResult<Value> {
        (self.handler)(arguments).await
    }
}

/// Ordered map with last-write-wins semantics shared by both registries.
struct Entries<T> {
    by_key: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: Clone> Entries<T> {
    fn new() -> Self {
        Self {
            by_key: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, key: String, value: T) -> bool {
        let replaced = self.by_key.insert(key.clone(), value).is_some();
        if !replaced {
            self.order.push(key);
        }
        replaced
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.by_key.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        self.by_key.get(key).cloned()
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|key| self.by_key.get(key))
    }
}

/// Registry of capabilities keyed by tool name
pub struct ToolRegistry {
    entries: RwLock<Entries<Arc<dyn Capability>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::new()),
        }
    }

    /// Register a capability under its definition's name.
    ///
    /// Returns `true` when an existing registration was replaced.
    pub fn register(&self, capability: Arc<dyn Capability>) -> bool {
        let name = capability.definition().name.clone();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, capability)
    }

    /// Remove a capability; returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Definitions in registration order
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|capability| capability.definition().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource definition as reported by `resources/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Produces the text of a resource on `resources/read`.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read(&self, uri: &str) -> McpResult<String>;
}

/// Reader returning fixed text.
#[derive(Debug, Clone)]
pub struct StaticResource {
    text: String,
}

impl StaticResource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Serve a JSON value as pretty-printed text.
    pub fn json(value: &Value) -> McpResult<Self> {
        Ok(Self::new(serde_json::to_string_pretty(value)?))
    }
}

#[async_trait]
impl ResourceReader for StaticResource {
    async fn read(&self, _uri: &str) -> McpResult<String> {
        Ok(self.text.clone())
    }
}

#[derive(Clone)]
struct ResourceEntry {
    definition: ResourceDefinition,
    reader: Arc<dyn ResourceReader>,
}

/// Registry of readable resources keyed by URI
pub struct ResourceRegistry {
    entries: RwLock<Entries<ResourceEntry>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::new()),
        }
    }

    /// Register a resource; returns `true` when an existing URI was replaced.
    pub fn register(&self, definition: ResourceDefinition, reader: Arc<dyn ResourceReader>) -> bool {
        let uri = definition.uri.clone();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, ResourceEntry { definition, reader })
    }

    pub fn unregister(&self, uri: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
    }

    pub fn get(&self, uri: &str) -> Option<(ResourceDefinition, Arc<dyn ResourceReader>)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|entry| (entry.definition, entry.reader))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    pub fn list(&self) -> Vec<ResourceDefinition> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(name: &str, description: &str) -> Arc<dyn Capability> {
        Arc::new(FnCapability::new(
            ToolDefinition::new(name, description, SchemaDescriptor::object()),
            |arguments| async move { Ok(Value::Object(arguments)) },
        ))
    }

    #[test]
    fn last_registration_wins_and_keeps_position() {
        let registry = ToolRegistry::new();
        assert!(!registry.register(echo("flyTo", "first")));
        assert!(!registry.register(echo("zoom", "zoom")));
        assert!(registry.register(echo("flyTo", "second")));

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["flyTo", "zoom"]);
        assert_eq!(
            registry.get("flyTo").map(|c| c.definition().description.clone()),
            Some("second".to_string())
        );
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ToolRegistry::new();
        registry.register(echo("addPoint", "point"));
        assert!(registry.unregister("addPoint"));
        assert!(!registry.unregister("addPoint"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn fn_capability_executes_and_validates() {
        let capability = FnCapability::new(
            ToolDefinition::new(
                "zoom",
                "Zoom the camera",
                SchemaDescriptor::object().property("amount", SchemaDescriptor::number(), true),
            ),
            |arguments| async move { Ok(json!({"zoomed": arguments.get("amount").cloned()})) },
        );

        let missing = Map::new();
        assert!(matches!(
            capability.validate(&missing),
            Err(McpError::InvalidParams(_))
        ));

        let args = json!({"amount": 2}).as_object().cloned().unwrap();
        assert!(capability.validate(&args).is_ok());
        let result = capability.execute(args).await.unwrap();
        assert_eq!(result, json!({"zoomed": 2}));
    }

    #[test]
    fn resources_register_and_read() {
        let registry = ResourceRegistry::new();
        let definition = ResourceDefinition::new("globe://camera", "Camera state")
            .with_mime_type("application/json");
        assert!(!registry.register(definition, Arc::new(StaticResource::new("{}"))));

        let (definition, reader) = registry.get("globe://camera").unwrap();
        assert_eq!(definition.mime_type.as_deref(), Some("application/json"));
        let text = tokio_test::block_on(reader.read("globe://camera")).unwrap();
        assert_eq!(text, "{}");

        assert!(registry.unregister("globe://camera"));
        assert!(!registry.unregister("globe://camera"));
    }

    #[test]
    fn definitions_serialize_in_camel_case() {
        let definition = ToolDefinition::new("flyTo", "Fly", SchemaDescriptor::object());
        let value = serde_json::to_value(&definition).unwrap();
        assert!(value.get("inputSchema").is_some());

        let resource = ResourceDefinition::new("a://b", "b").with_mime_type("text/plain");
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["mimeType"], "text/plain");
        assert!(value.get("description").is_none());
    }
}
