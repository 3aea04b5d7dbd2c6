//! # Terrapilot Bridge
//!
//! Host-side bridge to a protocol module compiled to WebAssembly. The module
//! owns its own garbage-collected heap; the bridge marshals strings in and
//! out of linear memory, keeps every pointer it holds pinned for exactly the
//! duration of one call, and runs the tools the module asks the host for.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use terrapilot_bridge::{BridgeConfig, WasmBridge};
//! # use terrapilot_core::{CoreResult, ToolCall, ToolExecutor};
//! # struct Surface;
//! # #[async_trait::async_trait]
//! # impl ToolExecutor for Surface {
//! #     async fn execute(&self, _call: &ToolCall) -> CoreResult<serde_json::Value> {
//! #         Ok(serde_json::Value::Null)
//! #     }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::from_env()?;
//! let bridge = WasmBridge::from_config(&config, Arc::new(Surface)).await?;
//!
//! let reply = bridge
//!     .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
//!     .await?;
//! println!("{}", reply.output);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod callbacks;
pub mod codec;
pub mod config;
pub mod error;
pub mod module;
pub mod pin;

pub use bridge::{BridgeReply, InvocationOutcome, REQUIRED_EXPORTS, WasmBridge};
pub use callbacks::{CallbackOutcome, CallbackRegistry};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use module::{ModuleEvent, ModuleHandle, ToolInvocation, WasmtimeModule};
pub use pin::PinScope;
