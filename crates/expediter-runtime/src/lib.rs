//! # expediter-runtime
//!
//! The orchestration engine. Ties the planner, the tool registry, the
//! dispatch transport, and the durable store into the coordination loop:
//! consult the planner, open a tracking batch, publish one dispatch
//! message per requested invocation, then go idle until completion
//! events arrive. The activation that records the final pending task as
//! done folds the aggregated results back into the conversation and
//! consults the planner again.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use errors::{EngineError, Result};
pub use events::{CompletionDetail, CompletionEvent, COMPLETION_SOURCE};
pub use orchestrator::{CompletionOutcome, DEFAULT_SYSTEM_PROMPT, Orchestrator, OrchestratorConfig};
pub use registry::ToolRegistry;
pub use transport::{DispatchMessage, InProcessTransport, Transport, TransportError};
