//! # Terrapilot Core
//!
//! Shared building blocks for the Terrapilot workspace: the decomposition data
//! model, the structured tool call, the adapter traits the orchestrator drives,
//! and environment-based configuration helpers.
//!
//! ## Adapter seams
//!
//! - [`Decomposer`]: instruction text to an ordered list of [`AtomicCommand`]s
//! - [`InferenceAdapter`]: step prompt to an optional [`ToolCall`]
//! - [`ToolExecutor`]: tool call to an arbitrary JSON result
//!
//! Each seam is an async trait so implementations can be backed by native
//! code, a remote model, a protocol handler or a compiled module.

pub mod call;
pub mod command;
pub mod config;
pub mod error;
pub mod geo;
pub mod prompt;
pub mod traits;

pub use call::{CapabilityKind, ToolCall};
pub use command::{AtomicCommand, CommandId, CommandIntent};
pub use config::ConfigError;
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use prompt::Prompt;
pub use traits::{Decomposer, InferenceAdapter, ToolExecutor};
