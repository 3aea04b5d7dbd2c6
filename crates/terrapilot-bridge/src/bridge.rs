//! # Wasm Bridge
//!
//! Safe, serialized access to a loaded protocol module.
//!
//! Every export call goes through one FIFO lock, so a second call never
//! starts while pointers from an earlier one are still pinned. Within a call
//! the input string and the returned pointer are held by a [`PinScope`] and
//! unpinned on every exit path.
//!
//! Tool invocations the module raises during a call are drained once the
//! call returns. Each one is registered under its callback id, run through
//! the host [`ToolExecutor`], settled exactly once and reported in the
//! [`BridgeReply`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use terrapilot_core::{CoreError, CoreResult, ToolCall, ToolExecutor};
use terrapilot_mcp::ToolDefinition;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::callbacks::{CallbackOutcome, CallbackRegistry};
use crate::codec;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::module::{ModuleEvent, ModuleHandle, ToolInvocation, WasmtimeModule};
use crate::pin::PinScope;

/// Exports every loadable module must provide
pub const REQUIRED_EXPORTS: &[&str] = &["__new", "__pin", "__unpin"];

/// Outcome of one host-side tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub callback_id: u32,
    pub tool: String,
    pub outcome: CallbackOutcome,
}

/// Everything one export call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeReply {
    /// String returned by the export
    pub output: String,
    /// Messages the module pushed through `sendResponse`
    pub responses: Vec<String>,
    pub invocations: Vec<InvocationOutcome>,
}

pub struct WasmBridge {
    module: Mutex<Option<Box<dyn ModuleHandle>>>,
    callbacks: CallbackRegistry,
    executor: Arc<dyn ToolExecutor>,
}

impl WasmBridge {
    /// Create an unloaded bridge. Tools the module invokes run on `executor`.
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            module: Mutex::new(None),
            callbacks: CallbackRegistry::new(),
            executor,
        }
    }

    /// Create a bridge and load the configured module file.
    pub async fn from_config(
        config: &BridgeConfig,
        executor: Arc<dyn ToolExecutor>,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let path = config
            .module_path
            .as_ref()
            .ok_or_else(|| BridgeError::LoadFailed("no module path configured".to_string()))?;

        let module = WasmtimeModule::from_file(path, config.fuel)?;
        let bridge = Self::new(executor);
        bridge.load(Box::new(module)).await?;
        info!(path = %path.display(), "Loaded protocol module");
        Ok(bridge)
    }

    /// Install a module, running its `init` export if present.
    ///
    /// On failure the bridge stays in its previous state.
    pub async fn load(&self, mut module: Box<dyn ModuleHandle>) -> BridgeResult<()> {
        for export in REQUIRED_EXPORTS {
            if !module.has_export(export) {
                return Err(BridgeError::MissingExport(export.to_string()));
            }
        }
        if module.has_export("init") {
            module
                .call("init", &[])
                .map_err(|e| BridgeError::LoadFailed(format!("init failed: {e}")))?;
        }

        *self.module.lock().await = Some(module);
        Ok(())
    }

    pub async fn is_loaded(&self) -> bool {
        self.module.lock().await.is_some()
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Dispatch one raw protocol message inside the module.
    pub async fn handle_message(&self, message: &str) -> BridgeResult<BridgeReply> {
        self.invoke("handleMessage", Some(message)).await
    }

    /// Parse a raw message with the module's own parser.
    pub async fn parse_json_rpc(&self, message: &str) -> BridgeResult<Value> {
        let reply = self.invoke("parseJsonRpc", Some(message)).await?;
        Ok(serde_json::from_str(&reply.output)?)
    }

    pub async fn serialize_json_rpc(&self, message: &Value) -> BridgeResult<String> {
        let input = serde_json::to_string(message)?;
        let reply = self.invoke("serializeJsonRpc", Some(&input)).await?;
        Ok(reply.output)
    }

    pub async fn get_tool_definitions(&self) -> BridgeResult<Vec<ToolDefinition>> {
        let reply = self.invoke("getToolDefinitions", None).await?;
        Ok(serde_json::from_str(&reply.output)?)
    }

    pub async fn execute_tool_call(&self, call: &ToolCall) -> BridgeResult<BridgeReply> {
        let input = serde_json::to_string(call)?;
        self.invoke("executeToolCall", Some(&input)).await
    }

    /// Call a string-in/string-out export and drain what it raised.
    pub async fn invoke(&self, export: &str, input: Option<&str>) -> BridgeResult<BridgeReply> {
        let (output, events) = {
            let mut guard = self.module.lock().await;
            let module = guard.as_deref_mut().ok_or(BridgeError::NotLoaded)?;

            debug!(export, "Calling module export");
            let output = call_pinned(module, export, input);
            let events = module.take_events();
            collect_garbage(module);
            (output, events)
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                if !events.is_empty() {
                    warn!(export, dropped = events.len(), "Discarding events from failed call");
                }
                return Err(e);
            }
        };

        let mut responses = Vec::new();
        let mut invocations = Vec::new();
        for event in events {
            match event {
                ModuleEvent::Response(text) => responses.push(text),
                ModuleEvent::Invocation(invocation) => invocations.push(invocation),
            }
        }

        let invocations = self.settle_invocations(invocations).await?;
        Ok(BridgeReply {
            output,
            responses,
            invocations,
        })
    }

    async fn settle_invocations(
        &self,
        invocations: Vec<ToolInvocation>,
    ) -> BridgeResult<Vec<InvocationOutcome>> {
        let mut receivers = Vec::with_capacity(invocations.len());
        for invocation in &invocations {
            match self.callbacks.register(invocation.callback_id) {
                Ok(receiver) => receivers.push(receiver),
                Err(e) => {
                    for registered in &invocations[..receivers.len()] {
                        self.callbacks.release(registered.callback_id);
                    }
                    return Err(e);
                }
            }
        }

        let mut outcomes = Vec::with_capacity(invocations.len());
        for (invocation, receiver) in invocations.into_iter().zip(receivers) {
            let id = invocation.callback_id;
            let settled = match self.run_invocation(&invocation).await {
                Ok(value) => self.callbacks.resolve(id, value),
                Err(message) => self.callbacks.reject(id, message),
            };
            if let Err(e) = settled {
                self.callbacks.release(id);
                return Err(e);
            }

            let outcome = receiver
                .await
                .unwrap_or_else(|_| Err("callback dropped before settlement".to_string()));
            self.callbacks.release(id);
            outcomes.push(InvocationOutcome {
                callback_id: id,
                tool: invocation.tool,
                outcome,
            });
        }
        Ok(outcomes)
    }

    async fn run_invocation(&self, invocation: &ToolInvocation) -> Result<Value, String> {
        if !matches!(invocation.arguments, Value::Object(_) | Value::Null) {
            return Err(format!(
                "invalid arguments for {}: expected a JSON object",
                invocation.tool
            ));
        }

        let call = ToolCall::with_arguments(invocation.tool.clone(), invocation.arguments.clone());
        debug!(tool = %call.name, callback_id = invocation.callback_id, "Module invoked host tool");
        self.executor.execute(&call).await.map_err(|e| e.to_string())
    }
}

fn call_pinned(
    module: &mut dyn ModuleHandle,
    export: &str,
    input: Option<&str>,
) -> BridgeResult<String> {
    let mut scope = PinScope::new(module);

    let mut args = Vec::with_capacity(1);
    if let Some(text) = input {
        let ptr = codec::write_string(scope.module(), text)?;
        args.push(scope.pin(ptr)? as i32);
    }

    let ptr = scope.module().call(export, &args)?;
    if ptr == 0 {
        return Err(BridgeError::NullPointer {
            operation: export.to_string(),
        });
    }

    let ptr = scope.pin(ptr as u32)?;
    codec::read_string(scope.module(), ptr)
}

fn collect_garbage(module: &mut dyn ModuleHandle) {
    if !module.has_export("__collect") {
        return;
    }
    if let Err(e) = module.call("__collect", &[]) {
        warn!(error = %e, "Module collection failed");
    }
}

/// Interpret an `executeToolCall` output as a tool result.
///
/// An object with a non-null `error` member is a failure; text that is not
/// JSON is returned as a string.
fn tool_result(output: &str) -> CoreResult<Value> {
    match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => Err(CoreError::tool(message.clone())),
            Some(error) if !error.is_null() => Err(CoreError::tool(error.to_string())),
            _ => Ok(Value::Object(map)),
        },
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(output.to_string())),
    }
}

#[async_trait]
impl ToolExecutor for WasmBridge {
    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let reply = self.execute_tool_call(call).await?;
        tool_result(&reply.output)
    }
}
