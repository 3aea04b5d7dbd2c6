//! Atomic commands produced by decomposing one instruction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of an atomic command, unique within one decomposition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Create a command id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Sequential id used by decomposers that number their output (`cmd_1`, `cmd_2`, ...).
    pub fn sequential(index: usize) -> Self {
        Self(format!("cmd_{}", index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Closed set of intent tags a decomposer may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIntent {
    /// Move or orient the camera.
    Navigate,
    /// Add an entity to the scene.
    Create,
    /// Change an existing entity.
    Modify,
    /// Remove entities.
    Remove,
    /// Look up places or entities.
    Search,
    /// Change scene-level settings (imagery, terrain, time).
    Configure,
    /// Ask about the current state without changing it.
    Query,
}

impl CommandIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandIntent::Navigate => "navigate",
            CommandIntent::Create => "create",
            CommandIntent::Modify => "modify",
            CommandIntent::Remove => "remove",
            CommandIntent::Search => "search",
            CommandIntent::Configure => "configure",
            CommandIntent::Query => "query",
        }
    }

    /// All intents, in declaration order.
    pub fn all() -> &'static [CommandIntent] {
        &[
            CommandIntent::Navigate,
            CommandIntent::Create,
            CommandIntent::Modify,
            CommandIntent::Remove,
            CommandIntent::Search,
            CommandIntent::Configure,
            CommandIntent::Query,
        ]
    }
}

impl fmt::Display for CommandIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indivisible step of a decomposed instruction.
///
/// Created once by a decomposer and never mutated afterwards. Dependency ids
/// normally reference commands from the same decomposition, but consumers
/// must tolerate ids that reference nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicCommand {
    pub id: CommandId,
    pub intent: CommandIntent,
    /// The span of the original instruction this command covers.
    pub raw_text: String,
    #[serde(default)]
    pub dependencies: BTreeSet<CommandId>,
}

impl AtomicCommand {
    pub fn new(id: impl Into<CommandId>, intent: CommandIntent, raw_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intent,
            raw_text: raw_text.into(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Add a dependency on another command.
    pub fn depends_on(mut self, id: impl Into<CommandId>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_one_based() {
        assert_eq!(CommandId::sequential(0).as_str(), "cmd_1");
        assert_eq!(CommandId::sequential(4).as_str(), "cmd_5");
    }

    #[test]
    fn command_builder_collects_dependencies() {
        let cmd = AtomicCommand::new("cmd_2", CommandIntent::Create, "add a red sphere there")
            .depends_on("cmd_1")
            .depends_on("cmd_1");

        assert!(cmd.has_dependencies());
        assert_eq!(cmd.dependencies.len(), 1);
        assert!(cmd.dependencies.contains(&CommandId::from("cmd_1")));
    }

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&CommandIntent::Configure).unwrap();
        assert_eq!(json, "\"configure\"");

        let cmd: AtomicCommand = serde_json::from_str(
            r#"{"id":"a","intent":"navigate","raw_text":"fly to Paris"}"#,
        )
        .unwrap();
        assert_eq!(cmd.intent, CommandIntent::Navigate);
        assert!(cmd.dependencies.is_empty());
    }
}
