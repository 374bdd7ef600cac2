//! Task dispatcher.
//!
//! Takes the invocations the planner requested, resolves each name in
//! the registry, and publishes one [`DispatchMessage`] per resolvable
//! invocation to the tool's target queue. An unknown name is warn-logged
//! and skipped: its tracking flag can then never be set, so the batch
//! stalls visibly instead of the process crashing.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use expediter_core::{BatchId, OrchestrationId, ToolUseItem};

use crate::errors::Result;
use crate::registry::ToolRegistry;
use crate::transport::{DispatchMessage, Transport};

/// Publishes planner-requested invocations to worker queues.
pub struct Dispatcher {
    registry: ToolRegistry,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry` and `transport`.
    #[must_use]
    pub fn new(registry: ToolRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Publish one message per resolvable invocation.
    ///
    /// Returns the number of messages actually published; callers track
    /// the full invocation set independently, so a skipped unknown tool
    /// leaves its flag pending forever rather than being silently
    /// forgotten.
    #[instrument(skip_all, fields(orchestration_id = %orchestration_id, batch_id = %batch_id))]
    pub async fn dispatch(
        &self,
        orchestration_id: &OrchestrationId,
        batch_id: &BatchId,
        invocations: &[&ToolUseItem],
    ) -> Result<usize> {
        let mut published = 0;
        for invocation in invocations {
            let Some(descriptor) = self.registry.resolve(&invocation.name)? else {
                warn!(
                    tool = %invocation.name,
                    "planner requested unregistered tool, skipping dispatch; batch will stall"
                );
                continue;
            };
            let message = DispatchMessage {
                tool_input: invocation.input.clone(),
                orchestration_id: orchestration_id.clone(),
                batch_id: batch_id.clone(),
                tool_use_id: invocation.tool_use_id.clone(),
                node: invocation.name.clone(),
            };
            self.transport.publish(&descriptor.target, &message).await?;
            published += 1;
        }
        info!(published, requested = invocations.len(), "dispatched batch");
        Ok(published)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InProcessTransport;
    use expediter_core::{DispatchKind, InputSchema, InvocationId, ToolDescriptor};
    use expediter_store::Store;
    use serde_json::json;

    fn registered_store(names: &[&str]) -> Store {
        let store = Store::open_in_memory().unwrap();
        for name in names {
            let schema = InputSchema::from_json_schema(&json!({
                "type": "object", "properties": {}, "required": []
            }))
            .unwrap();
            store
                .upsert_tool(&ToolDescriptor {
                    name: (*name).to_owned(),
                    description: String::new(),
                    schema,
                    kind: DispatchKind::Queue,
                    target: format!("queue://{name}"),
                })
                .unwrap();
        }
        store
    }

    fn invocation(name: &str) -> ToolUseItem {
        ToolUseItem {
            tool_use_id: InvocationId::new(),
            name: name.into(),
            input: json!({"order": name}),
        }
    }

    #[tokio::test]
    async fn publishes_to_each_tools_target() {
        let transport = Arc::new(InProcessTransport::new());
        let dispatcher = Dispatcher::new(
            ToolRegistry::new(registered_store(&["cook_burger", "fry_fries"])),
            transport.clone(),
        );
        let orchestration_id = OrchestrationId::new();
        let batch_id = BatchId::new();
        let burger = invocation("cook_burger");
        let fries = invocation("fry_fries");

        let published = dispatcher
            .dispatch(&orchestration_id, &batch_id, &[&burger, &fries])
            .await
            .unwrap();
        assert_eq!(published, 2);

        let messages = transport.drain("queue://cook_burger");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].node, "cook_burger");
        assert_eq!(messages[0].batch_id, batch_id);
        assert_eq!(messages[0].tool_use_id, burger.tool_use_id);
        assert_eq!(messages[0].tool_input, json!({"order": "cook_burger"}));
        assert_eq!(transport.drain("queue://fry_fries").len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_skipped_not_fatal() {
        let transport = Arc::new(InProcessTransport::new());
        let dispatcher = Dispatcher::new(
            ToolRegistry::new(registered_store(&["cook_burger"])),
            transport.clone(),
        );
        let burger = invocation("cook_burger");
        let ghost = invocation("wash_dishes");

        let published = dispatcher
            .dispatch(&OrchestrationId::new(), &BatchId::new(), &[&ghost, &burger])
            .await
            .unwrap();

        assert_eq!(published, 1);
        assert_eq!(transport.drain("queue://cook_burger").len(), 1);
        assert!(transport.drain("queue://wash_dishes").is_empty());
    }
}
