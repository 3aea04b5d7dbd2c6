//! Step prompt construction.

use terrapilot_core::{AtomicCommand, Prompt};
use terrapilot_mcp::ToolDefinition;

use crate::context::CommandContext;

/// Default system instruction for globe-control models.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that controls a 3D globe. \
Convert natural language commands into JSON tool calls. \
Respond with a single JSON object of the form {\"name\": \"<tool>\", \"arguments\": {...}}.";

/// Longest rendering of a prior result kept in the prompt.
const MAX_RESULT_CHARS: usize = 200;

/// Builds the prompt for one step from the command and the run context.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    tools: Vec<ToolDefinition>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            tools: Vec::new(),
        }
    }

    /// List these tools in the system prompt.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn build(&self, command: &AtomicCommand, context: &CommandContext) -> Prompt {
        Prompt::new(self.system_text(), user_text(command, context))
    }

    fn system_text(&self) -> String {
        if self.tools.is_empty() {
            return self.system.clone();
        }
        let mut text = self.system.clone();
        text.push_str("\n\nAvailable tools:");
        for tool in &self.tools {
            text.push_str(&format!("\n- {}: {}", tool.name, tool.description));
        }
        text
    }
}

fn user_text(command: &AtomicCommand, context: &CommandContext) -> String {
    let mut text = format!(
        "Command: {}\nIntent: {}\n\nContext:",
        command.raw_text,
        command.intent.as_str()
    );

    if context.is_empty() {
        text.push_str("\n- none");
        return text;
    }

    if let Some(location) = &context.current_location {
        text.push_str(&format!(
            "\n- Current location: longitude {}, latitude {}",
            location.longitude, location.latitude
        ));
        if let Some(height) = location.height {
            text.push_str(&format!(", height {height}"));
        }
    }

    if !context.created_entities.is_empty() {
        let entities: Vec<String> = context
            .created_entities
            .iter()
            .map(|(id, entity)| format!("{entity} (from {id})"))
            .collect();
        text.push_str(&format!("\n- Created entities: {}", entities.join(", ")));
    }

    if let Some(results) = &context.search_results {
        text.push_str(&format!("\n- Last search returned {} result(s)", results.len()));
    }

    if !context.previous_results.is_empty() {
        text.push_str("\n- Previous results:");
        for (id, result) in &context.previous_results {
            text.push_str(&format!("\n  - {id}: {}", truncate(&result.to_string())));
        }
    }

    text
}

fn truncate(rendered: &str) -> String {
    if rendered.chars().count() <= MAX_RESULT_CHARS {
        return rendered.to_string();
    }
    let mut cut: String = rendered.chars().take(MAX_RESULT_CHARS).collect();
    cut.push_str("...");
    cut
}
