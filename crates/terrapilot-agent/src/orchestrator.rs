//! Command orchestrator
//!
//! Drives one instruction through decomposition, then walks the resulting
//! commands in order. Each step checks its dependencies against the steps
//! that already succeeded, asks the inference adapter for a tool call, runs
//! it through the executor and folds the result into the run context.
//!
//! Per-step failures are recorded and the run continues. A run succeeds when
//! at least one step succeeded.
//!
//! # Example
//! ```rust,ignore
//! let orchestrator = Orchestrator::new(KeywordDecomposer::new(), inference, executor)
//!     .with_config(OrchestratorConfig::from_env()?);
//!
//! let result = orchestrator.execute("fly to Paris then add a marker there").await;
//! for step in &result.steps {
//!     println!("{} -> {:?}", step.command_id, step.error);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use terrapilot_core::{
    AtomicCommand, CommandId, CommandIntent, Decomposer, InferenceAdapter, ToolCall, ToolExecutor,
};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::context::CommandContext;
use crate::prompt::PromptBuilder;

/// Error recorded on a step whose dependencies did not all succeed.
pub const DEPENDENCIES_NOT_SATISFIED: &str = "Dependencies not satisfied";

/// Error recorded when the inference adapter produced no call.
pub const NO_TOOL_CALL: &str = "Model did not produce a tool call";

/// Outcome of one attempted command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub command_id: CommandId,
    pub intent: CommandIntent,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration: Duration,
}

impl StepResult {
    fn failed(
        command: &AtomicCommand,
        tool_call: Option<ToolCall>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            command_id: command.id.clone(),
            intent: command.intent,
            success: false,
            tool_call,
            result: None,
            error: Some(error.into()),
            duration,
        }
    }

    fn succeeded(
        command: &AtomicCommand,
        tool_call: ToolCall,
        result: Value,
        duration: Duration,
    ) -> Self {
        Self {
            command_id: command.id.clone(),
            intent: command.intent,
            success: true,
            tool_call: Some(tool_call),
            result: Some(result),
            error: None,
            duration,
        }
    }
}

/// Outcome of one `execute` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// At least one step succeeded
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub total_duration: Duration,
    pub decomposition: Vec<AtomicCommand>,
    pub context: CommandContext,
}

impl OrchestrationResult {
    pub fn succeeded_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|step| step.success)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|step| !step.success)
    }

    /// Whether every decomposed command was attempted and succeeded.
    pub fn is_complete(&self) -> bool {
        !self.decomposition.is_empty()
            && self.steps.len() == self.decomposition.len()
            && self.steps.iter().all(|step| step.success)
    }
}

/// Cursor and accumulator for one run.
struct RunState {
    started: Instant,
    cursor: usize,
    steps: Vec<StepResult>,
    succeeded: HashSet<CommandId>,
    context: CommandContext,
}

impl RunState {
    fn new(started: Instant) -> Self {
        Self {
            started,
            cursor: 0,
            steps: Vec::new(),
            succeeded: HashSet::new(),
            context: CommandContext::new(),
        }
    }

    fn dependencies_satisfied(&self, command: &AtomicCommand) -> bool {
        command
            .dependencies
            .iter()
            .all(|dependency| self.succeeded.contains(dependency))
    }

    fn record(&mut self, step: StepResult) {
        if step.success {
            self.succeeded.insert(step.command_id.clone());
        }
        self.steps.push(step);
        self.cursor += 1;
    }
}

/// Runs instructions against a decomposer, an inference adapter and a tool
/// executor.
///
/// Holds no per-run state, so one orchestrator can serve concurrent runs.
pub struct Orchestrator<D, I, E> {
    decomposer: D,
    inference: I,
    executor: E,
    config: OrchestratorConfig,
    prompts: PromptBuilder,
}

impl<D, I, E> Orchestrator<D, I, E>
where
    D: Decomposer,
    I: InferenceAdapter,
    E: ToolExecutor,
{
    pub fn new(decomposer: D, inference: I, executor: E) -> Self {
        Self {
            decomposer,
            inference,
            executor,
            config: OrchestratorConfig::default(),
            prompts: PromptBuilder::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Execute one instruction end to end.
    ///
    /// Never fails: decomposition errors, missing calls and tool failures
    /// are all reported inside the returned result.
    pub async fn execute(&self, instruction: &str) -> OrchestrationResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestration_run", run_id = %run_id);
        self.run(run_id, instruction).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, instruction: &str) -> OrchestrationResult {
        let started_at = Utc::now();
        let mut state = RunState::new(Instant::now());

        info!(instruction_len = instruction.len(), "Starting orchestration run");

        let decomposition = match self.decomposer.decompose(instruction).await {
            Ok(commands) => commands,
            Err(e) => {
                warn!(error = %e, "Decomposition failed");
                Vec::new()
            }
        };

        if decomposition.is_empty() {
            info!("Instruction decomposed into no commands");
            return OrchestrationResult {
                run_id,
                started_at,
                success: false,
                steps: Vec::new(),
                total_duration: state.started.elapsed(),
                decomposition,
                context: state.context,
            };
        }

        debug!(commands = decomposition.len(), "Decomposed instruction");

        while state.cursor < decomposition.len() {
            if state.cursor >= self.config.max_steps {
                warn!(
                    max_steps = self.config.max_steps,
                    remaining = decomposition.len() - state.cursor,
                    "Step limit reached"
                );
                break;
            }
            if state.started.elapsed() >= self.config.run_timeout {
                warn!(
                    timeout_ms = self.config.run_timeout.as_millis() as u64,
                    completed = state.steps.len(),
                    "Run budget exhausted"
                );
                break;
            }

            let command = &decomposition[state.cursor];
            let step = self.run_step(command, &mut state).await;
            state.record(step);
        }

        let success = state.steps.iter().any(|step| step.success);
        let total_duration = state.started.elapsed();

        info!(
            steps = state.steps.len(),
            succeeded = state.succeeded.len(),
            success,
            duration_ms = total_duration.as_millis() as u64,
            "Orchestration run finished"
        );

        OrchestrationResult {
            run_id,
            started_at,
            success,
            steps: state.steps,
            total_duration,
            decomposition,
            context: state.context,
        }
    }

    async fn run_step(&self, command: &AtomicCommand, state: &mut RunState) -> StepResult {
        let step_start = Instant::now();

        if !state.dependencies_satisfied(command) {
            warn!(
                command = %command.id,
                dependencies = ?command.dependencies,
                "Skipping step with unsatisfied dependencies"
            );
            return StepResult::failed(
                command,
                None,
                DEPENDENCIES_NOT_SATISFIED,
                step_start.elapsed(),
            );
        }

        let prompt = self.prompts.build(command, &state.context);
        let call = match self.inference.infer(&prompt).await {
            Ok(Some(call)) => call,
            Ok(None) => {
                warn!(command = %command.id, "Model did not produce a tool call");
                return StepResult::failed(command, None, NO_TOOL_CALL, step_start.elapsed());
            }
            Err(e) => {
                warn!(command = %command.id, error = %e, "Inference failed");
                return StepResult::failed(command, None, e.to_string(), step_start.elapsed());
            }
        };

        debug!(command = %command.id, tool = %call.name, "Executing tool call");

        match self.executor.execute(&call).await {
            Ok(result) => {
                state.context.record_success(&command.id, &call, &result);
                debug!(command = %command.id, tool = %call.name, "Step succeeded");
                StepResult::succeeded(command, call, result, step_start.elapsed())
            }
            Err(e) => {
                warn!(command = %command.id, tool = %call.name, error = %e, "Tool execution failed");
                StepResult::failed(command, Some(call), e.to_string(), step_start.elapsed())
            }
        }
    }
}
