//! # Mock Adapters for Testing
//!
//! Scripted implementations of the three orchestration seams. Every mock
//! records how often and with what it was called, so tests can assert that a
//! step was skipped without touching an adapter.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use terrapilot_core::{
    AtomicCommand, CoreError, CoreResult, Decomposer, InferenceAdapter, Prompt, ToolCall,
    ToolExecutor,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A decomposer returning a fixed command list
#[derive(Debug, Clone)]
pub struct MockDecomposer {
    commands: Vec<AtomicCommand>,
    failure: Option<String>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockDecomposer {
    /// Return these commands for every instruction
    pub fn new(commands: Vec<AtomicCommand>) -> Self {
        Self {
            commands,
            failure: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return no commands
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Fail every call with this message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::empty()
        }
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_history).len()
    }

    /// Instructions passed to this decomposer
    pub fn call_history(&self) -> Vec<String> {
        lock(&self.call_history).clone()
    }
}

#[async_trait]
impl Decomposer for MockDecomposer {
    async fn decompose(&self, instruction: &str) -> CoreResult<Vec<AtomicCommand>> {
        lock(&self.call_history).push(instruction.to_string());
        match &self.failure {
            Some(message) => Err(CoreError::Decomposition(message.clone())),
            None => Ok(self.commands.clone()),
        }
    }
}

/// One scripted inference outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Call(ToolCall),
    NoCall,
    Failure(String),
}

/// An inference adapter replaying scripted replies in order
///
/// Once the script is exhausted every call gets the default reply
/// (`NoCall` unless changed).
#[derive(Debug, Clone)]
pub struct MockInference {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    default_reply: MockReply,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: MockReply::NoCall,
            delay: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replay these calls in order
    pub fn with_calls(calls: impl IntoIterator<Item = ToolCall>) -> Self {
        let mock = Self::new();
        lock(&mock.script).extend(calls.into_iter().map(MockReply::Call));
        mock
    }

    /// Append one reply to the script
    pub fn then(self, reply: MockReply) -> Self {
        lock(&self.script).push_back(reply);
        self
    }

    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Sleep before answering, to exercise run budgets
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received, in order
    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl InferenceAdapter for MockInference {
    async fn infer(&self, prompt: &Prompt) -> CoreResult<Option<ToolCall>> {
        lock(&self.prompts).push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());

        match reply {
            MockReply::Call(call) => Ok(Some(call)),
            MockReply::NoCall => Ok(None),
            MockReply::Failure(message) => Err(CoreError::Inference(message)),
        }
    }
}

/// A tool executor with per-tool scripted outcomes
///
/// Tools without a scripted outcome succeed with `{"status": "ok"}`.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    outcomes: HashMap<String, Result<Value, String>>,
    call_history: Arc<Mutex<Vec<ToolCall>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with this result whenever `tool` is called
    pub fn with_result(mut self, tool: impl Into<String>, result: Value) -> Self {
        self.outcomes.insert(tool.into(), Ok(result));
        self
    }

    /// Fail with this message whenever `tool` is called
    pub fn with_failure(mut self, tool: impl Into<String>, message: impl Into<String>) -> Self {
        self.outcomes.insert(tool.into(), Err(message.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_history).len()
    }

    /// Calls received, in order
    pub fn call_history(&self) -> Vec<ToolCall> {
        lock(&self.call_history).clone()
    }

    pub fn was_called_with(&self, tool: &str) -> bool {
        lock(&self.call_history).iter().any(|call| call.name == tool)
    }

    pub fn reset(&self) {
        lock(&self.call_history).clear();
    }
}

#[async_trait]
impl ToolExecutor for MockExecutor {
    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        lock(&self.call_history).push(call.clone());
        match self.outcomes.get(&call.name) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(CoreError::tool(message.clone())),
            None => Ok(json!({"status": "ok"})),
        }
    }
}
