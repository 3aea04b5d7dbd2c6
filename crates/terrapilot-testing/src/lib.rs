//! # Terrapilot Testing
//!
//! Mock implementations of the orchestration seams with call counters and
//! histories. Mocks are cheap to clone and clones share their counters, so a
//! test can hand one clone to the orchestrator and keep another to inspect.
//!
//! ```rust
//! use terrapilot_core::ToolCall;
//! use terrapilot_testing::{MockExecutor, MockInference};
//!
//! let inference = MockInference::with_calls([ToolCall::new("flyTo").arg("longitude", 2.35)]);
//! let executor = MockExecutor::new();
//! assert_eq!(inference.call_count(), 0);
//! assert_eq!(executor.call_count(), 0);
//! ```

/// Mock decomposer, inference adapter and tool executor
pub mod mock_adapters;

pub use mock_adapters::{MockDecomposer, MockExecutor, MockInference, MockReply};
