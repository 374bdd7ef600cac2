//! Completion event wire format.
//!
//! Workers publish one of these when a dispatched task finishes. The
//! envelope `source` discriminates completion events from other traffic
//! on the same bus; the detail carries the correlation ids echoed from
//! the dispatch message plus the task's result payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use expediter_core::{BatchId, InvocationId, OrchestrationId};

/// Envelope source value identifying a task completion.
pub const COMPLETION_SOURCE: &str = "task.completion";

/// The body of a completion event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionDetail {
    /// The orchestration this task belongs to.
    pub orchestration_id: OrchestrationId,
    /// The tracking batch the task was dispatched under.
    pub batch_id: BatchId,
    /// The originating invocation.
    pub tool_use_id: InvocationId,
    /// Task (tool) name, the tracking key within the batch.
    pub node: String,
    /// The task's result payload.
    pub data: Value,
}

/// A completion event as received off the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Envelope source; must equal [`COMPLETION_SOURCE`].
    pub source: String,
    /// Event body.
    pub detail: CompletionDetail,
}

impl CompletionEvent {
    /// Build a well-formed completion event.
    #[must_use]
    pub fn new(detail: CompletionDetail) -> Self {
        Self {
            source: COMPLETION_SOURCE.to_owned(),
            detail,
        }
    }

    /// Whether the envelope is a task completion.
    #[must_use]
    pub fn is_completion(&self) -> bool {
        self.source == COMPLETION_SOURCE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
