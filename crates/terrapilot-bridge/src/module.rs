//! # Module Handles
//!
//! [`ModuleHandle`] is the narrow seam between the bridge and a loaded
//! module: call an export with `i32` arguments, read and write linear
//! memory, and collect the events the module raised through its imports.
//!
//! [`WasmtimeModule`] is the production implementation. It supplies the
//! `env` imports a compiled protocol module expects:
//!
//! | Import | Signature | Host behaviour |
//! |---|---|---|
//! | `abort` | `(msg, file, line, col)` | logs at `error`, traps the call |
//! | `trace` | `(msg, n, a0..a4: f64)` | logs at `trace` |
//! | `log` | `(msg)` | logs at `info` |
//! | `sendResponse` | `(msg)` | records a [`ModuleEvent::Response`] |
//! | `invokeTool` | `(name, args, callback_id)` | records a [`ModuleEvent::Invocation`] |

use serde_json::Value;
use std::path::Path;
use tracing::{error, info, trace};
use wasmtime::{Caller, Config, Engine, Extern, Instance, Linker, Memory, Module, Store, Trap, Val};

use crate::codec;
use crate::error::{BridgeError, BridgeResult};

const MODULE_TARGET: &str = "terrapilot_bridge::module";

/// A capability the module asked the host to run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    /// Parsed JSON arguments, or the raw text when it was not JSON
    pub arguments: Value,
    pub callback_id: u32,
}

/// Something the module reported through an import during a call
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleEvent {
    Response(String),
    Invocation(ToolInvocation),
}

/// A loaded module the bridge can drive.
///
/// Implementations are not required to be re-entrant; the bridge never
/// issues overlapping calls.
pub trait ModuleHandle: Send {
    fn has_export(&mut self, name: &str) -> bool;

    /// Call an export. Exports without a result return 0.
    fn call(&mut self, export: &str, args: &[i32]) -> BridgeResult<i32>;

    fn read(&self, ptr: u32, buf: &mut [u8]) -> BridgeResult<()>;

    fn write(&mut self, ptr: u32, data: &[u8]) -> BridgeResult<()>;

    /// Drain events raised since the last drain.
    fn take_events(&mut self) -> Vec<ModuleEvent>;
}

#[derive(Default)]
struct HostState {
    events: Vec<ModuleEvent>,
    abort: Option<String>,
}

/// A WebAssembly module running under wasmtime
pub struct WasmtimeModule {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
    fuel: Option<u64>,
}

impl WasmtimeModule {
    /// Compile and instantiate a module from binary or text format.
    ///
    /// With `fuel` set, every export call gets that much fuel and traps when
    /// it runs out.
    pub fn from_bytes(bytes: impl AsRef<[u8]>, fuel: Option<u64>) -> BridgeResult<Self> {
        let engine = engine(fuel)?;
        let module = Module::new(&engine, bytes).map_err(load_error)?;
        Self::instantiate(&engine, &module, fuel)
    }

    pub fn from_file(path: impl AsRef<Path>, fuel: Option<u64>) -> BridgeResult<Self> {
        let engine = engine(fuel)?;
        let module = Module::from_file(&engine, path.as_ref()).map_err(|e| {
            BridgeError::LoadFailed(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::instantiate(&engine, &module, fuel)
    }

    fn instantiate(engine: &Engine, module: &Module, fuel: Option<u64>) -> BridgeResult<Self> {
        let mut linker = Linker::new(engine);
        define_imports(&mut linker)?;

        let mut store = Store::new(engine, HostState::default());
        let instance = linker
            .instantiate(&mut store, module)
            .map_err(load_error)?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| BridgeError::MissingExport("memory".to_string()))?;

        Ok(Self {
            store,
            instance,
            memory,
            fuel,
        })
    }

    fn call_error(&mut self, export: &str, error: wasmtime::Error) -> BridgeError {
        if let Some(message) = self.store.data_mut().abort.take() {
            return BridgeError::ModuleAbort(message);
        }
        match error.downcast_ref::<Trap>() {
            Some(Trap::OutOfFuel) => BridgeError::Trap(format!("{export}: out of fuel")),
            _ => BridgeError::Trap(format!("{export}: {error}")),
        }
    }
}

impl ModuleHandle for WasmtimeModule {
    fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_export(&mut self.store, name).is_some()
    }

    fn call(&mut self, export: &str, args: &[i32]) -> BridgeResult<i32> {
        let func = self
            .instance
            .get_func(&mut self.store, export)
            .ok_or_else(|| BridgeError::MissingExport(export.to_string()))?;

        if let Some(fuel) = self.fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| BridgeError::Trap(e.to_string()))?;
        }

        let params: Vec<Val> = args.iter().copied().map(Val::I32).collect();
        let mut results = vec![Val::I32(0); func.ty(&self.store).results().len()];

        match func.call(&mut self.store, &params, &mut results) {
            Ok(()) => Ok(results.first().and_then(Val::i32).unwrap_or(0)),
            Err(e) => Err(self.call_error(export, e)),
        }
    }

    fn read(&self, ptr: u32, buf: &mut [u8]) -> BridgeResult<()> {
        self.memory
            .read(&self.store, ptr as usize, buf)
            .map_err(|_| BridgeError::MemoryAccess {
                ptr,
                len: buf.len(),
            })
    }

    fn write(&mut self, ptr: u32, data: &[u8]) -> BridgeResult<()> {
        self.memory
            .write(&mut self.store, ptr as usize, data)
            .map_err(|_| BridgeError::MemoryAccess {
                ptr,
                len: data.len(),
            })
    }

    fn take_events(&mut self) -> Vec<ModuleEvent> {
        std::mem::take(&mut self.store.data_mut().events)
    }
}

fn engine(fuel: Option<u64>) -> BridgeResult<Engine> {
    let mut config = Config::new();
    config.consume_fuel(fuel.is_some());
    Engine::new(&config).map_err(load_error)
}

fn load_error(error: wasmtime::Error) -> BridgeError {
    BridgeError::LoadFailed(error.to_string())
}

/// Read a string argument passed to an import. A null pointer reads as `None`.
fn guest_string(caller: &mut Caller<'_, HostState>, ptr: i32) -> wasmtime::Result<Option<String>> {
    if ptr == 0 {
        return Ok(None);
    }
    let memory = caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmtime::Error::msg("module exports no memory"))?;

    let store = &*caller;
    let text = codec::read_string_with(ptr as u32, |offset, buf| {
        memory
            .read(store, offset as usize, buf)
            .map_err(|_| BridgeError::MemoryAccess {
                ptr: offset,
                len: buf.len(),
            })
    })
    .map_err(|e| wasmtime::Error::msg(e.to_string()))?;

    Ok(Some(text))
}

fn define_imports(linker: &mut Linker<HostState>) -> BridgeResult<()> {
    linker
        .func_wrap(
            "env",
            "abort",
            |mut caller: Caller<'_, HostState>,
             message: i32,
             file: i32,
             line: i32,
             column: i32|
             -> wasmtime::Result<()> {
                let message = guest_string(&mut caller, message)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "abort".to_string());
                let file = guest_string(&mut caller, file)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "<unknown>".to_string());
                let location = format!("{file}:{line}:{column}");

                error!(target: MODULE_TARGET, %location, "Module aborted: {message}");
                caller.data_mut().abort = Some(format!("{message} at {location}"));
                Err(wasmtime::Error::msg("module aborted"))
            },
        )
        .map_err(load_error)?;

    linker
        .func_wrap(
            "env",
            "trace",
            |mut caller: Caller<'_, HostState>,
             message: i32,
             count: i32,
             a0: f64,
             a1: f64,
             a2: f64,
             a3: f64,
             a4: f64|
             -> wasmtime::Result<()> {
                let message = guest_string(&mut caller, message)?.unwrap_or_default();
                let values: Vec<f64> = [a0, a1, a2, a3, a4]
                    .into_iter()
                    .take(count.clamp(0, 5) as usize)
                    .collect();
                trace!(target: MODULE_TARGET, ?values, "{message}");
                Ok(())
            },
        )
        .map_err(load_error)?;

    linker
        .func_wrap(
            "env",
            "log",
            |mut caller: Caller<'_, HostState>, message: i32| -> wasmtime::Result<()> {
                if let Some(message) = guest_string(&mut caller, message)? {
                    info!(target: MODULE_TARGET, "{message}");
                }
                Ok(())
            },
        )
        .map_err(load_error)?;

    linker
        .func_wrap(
            "env",
            "sendResponse",
            |mut caller: Caller<'_, HostState>, message: i32| -> wasmtime::Result<()> {
                let message = guest_string(&mut caller, message)?.unwrap_or_default();
                caller
                    .data_mut()
                    .events
                    .push(ModuleEvent::Response(message));
                Ok(())
            },
        )
        .map_err(load_error)?;

    linker
        .func_wrap(
            "env",
            "invokeTool",
            |mut caller: Caller<'_, HostState>,
             name: i32,
             arguments: i32,
             callback_id: i32|
             -> wasmtime::Result<()> {
                let tool = guest_string(&mut caller, name)?
                    .ok_or_else(|| wasmtime::Error::msg("invokeTool called with a null name"))?;
                let arguments = match guest_string(&mut caller, arguments)? {
                    Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                    None => Value::Null,
                };
                caller
                    .data_mut()
                    .events
                    .push(ModuleEvent::Invocation(ToolInvocation {
                        tool,
                        arguments,
                        callback_id: callback_id as u32,
                    }));
                Ok(())
            },
        )
        .map_err(load_error)?;

    Ok(())
}
