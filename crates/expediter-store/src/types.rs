//! Row types and operation outcomes returned by the store.

use chrono::Utc;
use serde_json::Value;

use expediter_core::{BatchId, InvocationId, OrchestrationId, Turn};

/// Lifecycle status of an orchestration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestrationStatus {
    /// No batch outstanding; the next step is a planner call.
    AwaitingPlan,
    /// A tracking batch is outstanding; waiting on completion events.
    Dispatched,
    /// The planner returned no task invocations; terminal.
    Done,
}

impl OrchestrationStatus {
    /// Stored string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPlan => "awaiting_plan",
            Self::Dispatched => "dispatched",
            Self::Done => "done",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "awaiting_plan" => Some(Self::AwaitingPlan),
            "dispatched" => Some(Self::Dispatched),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// One in-flight coordinated request.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestrationRecord {
    /// Unique id.
    pub id: OrchestrationId,
    /// Creation stamp, unix seconds.
    pub instance: i64,
    /// Lifecycle status.
    pub status: OrchestrationStatus,
    /// Full conversation history with the planner.
    pub conversation: Vec<Turn>,
    /// The currently outstanding tracking batch, if any.
    pub outstanding_batch: Option<BatchId>,
}

impl OrchestrationRecord {
    /// Create a fresh record around an initial conversation.
    #[must_use]
    pub fn new(conversation: Vec<Turn>) -> Self {
        Self {
            id: OrchestrationId::new(),
            instance: Utc::now().timestamp(),
            status: OrchestrationStatus::AwaitingPlan,
            conversation,
            outstanding_batch: None,
        }
    }
}

/// One member task of a tracking batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchTaskRow {
    /// Task (tool) name.
    pub task: String,
    /// The invocation that dispatched this task.
    pub invocation_id: InvocationId,
    /// Whether the task has reported completion.
    pub done: bool,
    /// Completion payload, once done.
    pub payload: Option<Value>,
}

/// Outcome of a `mark_done` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkDoneOutcome {
    /// This call flipped the last pending flag; the batch is complete.
    ///
    /// Exactly one call per batch ever returns this.
    Completed,
    /// The flag flipped but other member tasks are still pending.
    StillPending {
        /// Number of tasks still pending after this call.
        remaining: u32,
    },
    /// The task was already done; redelivered event, nothing changed.
    Duplicate,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
