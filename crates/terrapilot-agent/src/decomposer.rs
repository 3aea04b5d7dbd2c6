//! Keyword-driven instruction decomposer.
//!
//! Splits on sequencing connectives, tags each clause with an intent by
//! keyword and makes clauses that refer back (`it`, `there`, `them`) depend
//! on the clause before them. Good enough for scripted instructions and
//! tests; model-backed decomposers plug in through the same trait.

use async_trait::async_trait;
use terrapilot_core::{AtomicCommand, CommandId, CommandIntent, CoreResult, Decomposer};
use tracing::debug;

const SEPARATORS: &[&str] = &[" and then ", " after that ", ", then ", " then ", ";"];

const BACK_REFERENCES: &[&str] = &["it", "there", "them"];

/// Keyword table in match priority order.
const INTENT_KEYWORDS: &[(CommandIntent, &[&str])] = &[
    (
        CommandIntent::Remove,
        &["remove", "delete", "clear", "erase", "hide"],
    ),
    (
        CommandIntent::Search,
        &["find", "search", "where is", "locate", "look up", "lookup"],
    ),
    (
        CommandIntent::Navigate,
        &[
            "fly", "go to", "zoom", "navigate", "look at", "show me", "take me", "rotate",
            "tilt", "pan",
        ],
    ),
    (
        CommandIntent::Create,
        &[
            "add", "create", "place", "put", "draw", "mark", "drop", "spawn", "load",
        ],
    ),
    (
        CommandIntent::Configure,
        &[
            "set", "switch", "enable", "disable", "turn on", "turn off", "toggle",
        ],
    ),
    (
        CommandIntent::Modify,
        &[
            "change", "color", "colour", "move", "resize", "rename", "make", "update",
        ],
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordDecomposer;

impl KeywordDecomposer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous decomposition used by the trait implementation.
    pub fn split(&self, instruction: &str) -> Vec<AtomicCommand> {
        let mut commands: Vec<AtomicCommand> = Vec::new();

        for clause in split_clauses(instruction) {
            let words = normalized_words(clause);
            let id = CommandId::sequential(commands.len());
            let mut command = AtomicCommand::new(id, classify(&words), clause);

            if refers_back(&words) {
                if let Some(previous) = commands.last() {
                    command = command.depends_on(previous.id.clone());
                }
            }
            commands.push(command);
        }

        commands
    }
}

#[async_trait]
impl Decomposer for KeywordDecomposer {
    async fn decompose(&self, instruction: &str) -> CoreResult<Vec<AtomicCommand>> {
        let commands = self.split(instruction);
        debug!(commands = commands.len(), "Keyword decomposition");
        Ok(commands)
    }
}

/// Split on the earliest separator, preferring the longest at a position.
fn split_clauses(instruction: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lower = instruction.to_ascii_lowercase();
    let mut clauses = Vec::new();
    let mut rest_start = 0usize;

    loop {
        let next = SEPARATORS
            .iter()
            .filter_map(|sep| lower[rest_start..].find(sep).map(|pos| (rest_start + pos, sep.len())))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let end = next.map_or(instruction.len(), |(pos, _)| pos);
        push_clause(&mut clauses, &instruction[rest_start..end]);

        match next {
            Some((pos, len)) => rest_start = pos + len,
            None => break,
        }
    }

    clauses
}

fn push_clause<'a>(clauses: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw
        .trim()
        .trim_start_matches(',')
        .trim_end_matches(['.', ',', '!'])
        .trim();
    let trimmed = trimmed
        .strip_prefix("and ")
        .or_else(|| trimmed.strip_prefix("And "))
        .unwrap_or(trimmed)
        .trim();
    if !trimmed.is_empty() {
        clauses.push(trimmed);
    }
}

fn normalized_words(clause: &str) -> Vec<String> {
    clause
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

fn classify(words: &[String]) -> CommandIntent {
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(words, k)))
        .map_or(CommandIntent::Query, |(intent, _)| *intent)
}

fn refers_back(words: &[String]) -> bool {
    words
        .iter()
        .any(|word| BACK_REFERENCES.contains(&word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(command: &AtomicCommand) -> Vec<&str> {
        command.dependencies.iter().map(CommandId::as_str).collect()
    }

    #[test]
    fn splits_on_connectives() {
        let commands = KeywordDecomposer::new()
            .split("Fly to Paris then add a red marker there; zoom in and then remove the labels");
        let texts: Vec<&str> = commands.iter().map(|c| c.raw_text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Fly to Paris", "add a red marker there", "zoom in", "remove the labels"]
        );
        let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cmd_1", "cmd_2", "cmd_3", "cmd_4"]);
    }

    #[test]
    fn assigns_intents() {
        let commands = KeywordDecomposer::new().split(
            "find the Eiffel Tower; fly to it; add a sphere; set terrain to high; make it blue; delete all points; how far is Rome",
        );
        let intents: Vec<CommandIntent> = commands.iter().map(|c| c.intent).collect();
        assert_eq!(
            intents,
            vec![
                CommandIntent::Search,
                CommandIntent::Navigate,
                CommandIntent::Create,
                CommandIntent::Configure,
                CommandIntent::Modify,
                CommandIntent::Remove,
                CommandIntent::Query,
            ]
        );
    }

    #[test]
    fn back_references_depend_on_previous_clause() {
        let commands = KeywordDecomposer::new()
            .split("search for Tokyo after that fly there then add a label");
        assert!(commands[0].dependencies.is_empty());
        assert_eq!(ids(&commands[1]), vec!["cmd_1"]);
        assert!(commands[2].dependencies.is_empty());
    }

    #[test]
    fn first_clause_never_has_dependencies() {
        let commands = KeywordDecomposer::new().split("zoom into it");
        assert_eq!(commands.len(), 1);
        assert!(!commands[0].has_dependencies());
    }

    #[test]
    fn blank_instruction_yields_nothing() {
        assert!(KeywordDecomposer::new().split("   ").is_empty());
        assert!(KeywordDecomposer::new().split(" ; ; ").is_empty());
    }

    #[tokio::test]
    async fn trait_delegates_to_split() {
        let commands = KeywordDecomposer::new()
            .decompose("fly to Rome")
            .await
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].intent, CommandIntent::Navigate);
    }
}
