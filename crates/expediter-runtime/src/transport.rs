//! Dispatch transport seam.
//!
//! The engine never knows how a worker executes. A registered tool is a
//! name, a schema, and a target queue address; [`Transport::publish`]
//! delivers the invocation message to that address. Delivery is
//! at-least-once — the completion path is idempotent, so redelivery is
//! harmless.
//!
//! [`InProcessTransport`] backs each target with a named in-process
//! queue. It is the test transport and the demo transport; a broker
//! client slots in behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use expediter_core::{BatchId, InvocationId, OrchestrationId};

/// Errors raised by a dispatch transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The target queue exists but no longer accepts messages.
    #[error("queue {target} is closed")]
    Closed {
        /// Queue address.
        target: String,
    },

    /// Message serialization failed.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Broker-specific failure.
    #[error("{message}")]
    Broker {
        /// Error description.
        message: String,
    },
}

/// One task invocation on the wire to a worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchMessage {
    /// Structured input for the task.
    pub tool_input: Value,
    /// Orchestration the result must be correlated back to.
    pub orchestration_id: OrchestrationId,
    /// Tracking batch the task belongs to.
    pub batch_id: BatchId,
    /// Invocation id; echoed back in the completion event.
    pub tool_use_id: InvocationId,
    /// Task (tool) name.
    pub node: String,
}

/// Delivery mechanism for dispatch messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish one invocation message to `target`.
    async fn publish(&self, target: &str, message: &DispatchMessage)
    -> Result<(), TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-process transport
// ─────────────────────────────────────────────────────────────────────────────

struct Queue {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    rx: mpsc::UnboundedReceiver<DispatchMessage>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

/// Transport backed by named in-process queues, created on first use.
#[derive(Default)]
pub struct InProcessTransport {
    queues: Mutex<HashMap<String, Queue>>,
}

impl InProcessTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every message currently queued on `target`.
    ///
    /// Returns an empty vec for a target nothing has published to.
    pub fn drain(&self, target: &str) -> Vec<DispatchMessage> {
        let mut queues = self.queues.lock();
        let Some(queue) = queues.get_mut(target) else {
            return Vec::new();
        };
        let mut drained = Vec::new();
        while let Ok(message) = queue.rx.try_recv() {
            drained.push(message);
        }
        drained
    }

    /// Total messages currently queued across all targets.
    #[must_use]
    pub fn queued_len(&self, target: &str) -> usize {
        self.queues.lock().get(target).map_or(0, |q| q.rx.len())
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn publish(
        &self,
        target: &str,
        message: &DispatchMessage,
    ) -> Result<(), TransportError> {
        debug!(target, node = %message.node, "publishing dispatch message");
        let mut queues = self.queues.lock();
        let queue = queues.entry(target.to_owned()).or_insert_with(Queue::new);
        queue
            .tx
            .send(message.clone())
            .map_err(|_| TransportError::Closed {
                target: target.to_owned(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
