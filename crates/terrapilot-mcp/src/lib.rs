//! # Terrapilot MCP - Protocol Core
//!
//! Transport-agnostic JSON-RPC 2.0 handling for a capability server: a tool
//! registry, a resource registry and a dispatcher for the standard methods
//! (`initialize`, `initialized`, `ping`, `tools/list`, `tools/call`,
//! `resources/list`, `resources/read`).
//!
//! Protocol failures never escape as Rust errors across the boundary; they are
//! answered with one of the fixed JSON-RPC error codes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use terrapilot_mcp::{FnCapability, ProtocolHandler, SchemaDescriptor, ToolDefinition};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = ProtocolHandler::default();
//!     handler.register_tool(Arc::new(FnCapability::new(
//!         ToolDefinition::new("ping_globe", "Health check", SchemaDescriptor::object()),
//!         |_args| async { Ok(json!("pong")) },
//!     )));
//!
//!     let reply = handler
//!         .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
//!         .await;
//!     println!("{reply:?}");
//! }
//! ```

pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod registry;
pub mod schema;
pub mod server;

pub use error::{ErrorCode, McpError, McpResult};
pub use handler::{CallToolResult, Content, PROTOCOL_VERSION, ProtocolHandler, ServerInfo};
pub use jsonrpc::{Message, Rejected, Request, RequestId, Response, RpcError, parse_message};
pub use registry::{
    Capability, FnCapability, ResourceDefinition, ResourceReader, ResourceRegistry,
    StaticResource, ToolDefinition, ToolRegistry,
};
pub use schema::SchemaDescriptor;
pub use server::{serve_lines, serve_stdio};
