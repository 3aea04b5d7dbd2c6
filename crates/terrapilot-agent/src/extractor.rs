//! Tool-call extraction from free-form model output.
//!
//! Models wrap calls in prose, fence them in markdown, or emit several at
//! once. Each strategy below is tried in order and the first that yields a
//! well-formed call wins:
//!
//! 1. the whole trimmed text as one JSON document
//! 2. the contents of fenced code blocks
//! 3. balanced brace-delimited substrings, left to right
//!
//! A candidate is well formed when it is an object with a non-empty string
//! `name` (alias `tool`) and, optionally, an object `arguments` (alias
//! `params`).

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use terrapilot_core::ToolCall;

static CLOSING_FENCE: OnceLock<Option<Regex>> = OnceLock::new();

/// Closing fence must sit on its own line so backticks inside string values
/// do not end the block early.
fn closing_fence() -> Option<&'static Regex> {
    CLOSING_FENCE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*```[ \t]*$").ok())
        .as_ref()
}

/// Extract the first well-formed tool call, or `None`.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(call) = parse_document(trimmed).and_then(|v| call_from_value(&v)) {
        return Some(call);
    }

    for block in fenced_blocks(text) {
        if let Some(call) = parse_document(&block).and_then(|v| call_from_value(&v)) {
            return Some(call);
        }
    }

    brace_objects(text)
        .into_iter()
        .filter_map(parse_document)
        .find_map(|value| call_from_value(&value))
}

/// Extract every well-formed tool call.
///
/// A document that is an array of calls is accepted at the whole-text and
/// fenced-block stages. The substring stage collects all matching objects
/// rather than stopping at the first.
pub fn extract_all_tool_calls(text: &str) -> Vec<ToolCall> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(calls) = parse_document(trimmed).and_then(|v| calls_from_value(&v)) {
        return calls;
    }

    for block in fenced_blocks(text) {
        if let Some(calls) = parse_document(&block).and_then(|v| calls_from_value(&v)) {
            return calls;
        }
    }

    balanced_structures(text)
        .into_iter()
        .flat_map(|span| {
            parse_document(span)
                .and_then(|value| calls_from_value(&value))
                .unwrap_or_else(|| nested_calls(span))
        })
        .collect()
}

/// Calls nested anywhere inside `span`, outermost first. Objects inside an
/// accepted call are not reported again.
fn nested_calls(span: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut covered_until = 0usize;

    for (start, candidate) in brace_objects_at(span) {
        if start < covered_until {
            continue;
        }
        if let Some(call) = parse_document(candidate).and_then(|v| call_from_value(&v)) {
            covered_until = start + candidate.len();
            calls.push(call);
        }
    }

    calls
}

/// Accept one call object.
fn call_from_value(value: &Value) -> Option<ToolCall> {
    let object = value.as_object()?;

    let name = object
        .get("name")
        .or_else(|| object.get("tool"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let arguments = match object.get("arguments").or_else(|| object.get("params")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(_) => return None,
    };

    Some(ToolCall {
        name: name.to_string(),
        arguments,
    })
}

/// Accept one call object or an array holding at least one.
fn calls_from_value(value: &Value) -> Option<Vec<ToolCall>> {
    match value {
        Value::Array(items) => {
            let calls: Vec<ToolCall> = items.iter().filter_map(call_from_value).collect();
            (!calls.is_empty()).then_some(calls)
        }
        other => call_from_value(other).map(|call| vec![call]),
    }
}

/// Parse a JSON document, retrying once with raw newlines inside strings
/// escaped.
fn parse_document(candidate: &str) -> Option<Value> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    serde_json::from_str(candidate).ok().or_else(|| {
        let normalized = escape_newlines_in_strings(candidate);
        serde_json::from_str(&normalized).ok()
    })
}

/// Contents of every fenced code block, with or without a language tag.
fn fenced_blocks(text: &str) -> Vec<String> {
    let Some(closing) = closing_fence() else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    let mut search_from = 0usize;

    while let Some(relative) = text[search_from..].find("```") {
        let after_ticks = search_from + relative + 3;
        // Language tag runs to the end of the opening line.
        let Some(newline) = text[after_ticks..].find('\n') else {
            break;
        };
        let content_start = after_ticks + newline + 1;

        match closing.find(&text[content_start..]) {
            Some(m) => {
                blocks.push(text[content_start..content_start + m.start()].to_string());
                search_from = content_start + m.end();
            }
            None => break,
        }
    }

    blocks
}

/// Every balanced `{...}` substring at any nesting depth, ordered by start
/// position, ignoring braces inside JSON strings.
fn brace_objects(text: &str) -> Vec<&str> {
    brace_objects_at(text)
        .into_iter()
        .map(|(_, candidate)| candidate)
        .collect()
}

/// Balanced `{...}` substrings at any depth with their byte offsets,
/// ordered by start.
fn brace_objects_at(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    out.push((start, &text[start..=i]));
                }
            }
            _ => {}
        }
    }

    out.sort_by_key(|(start, _)| *start);
    out
}

/// Top-level balanced `{...}` and `[...]` substrings, ignoring brackets
/// inside JSON strings.
fn balanced_structures(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = None;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' | '[' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' | ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        out.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    out
}

fn escape_newlines_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(ch),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }

    out
}
