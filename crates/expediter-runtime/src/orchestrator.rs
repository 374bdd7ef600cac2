//! The coordination loop.
//!
//! Every public method is one short-lived activation: load durable
//! state, advance it, persist, return. Nothing is held in memory between
//! activations, so any process sharing the database can handle the next
//! event.
//!
//! The planning step orders its writes so a crash is always recoverable:
//! the tracking batch is created and recorded on the orchestration
//! *before* any dispatch message is published. A completion event can
//! therefore never arrive for a batch the store has not seen.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use expediter_core::{
    BatchId, ContentItem, OrchestrationId, ToolResultItem, ToolUseItem, Turn, normalize_numbers,
};
use expediter_planner::{InferenceParams, PlanRequest, Planner, PlannerTurn, StopReason};
use expediter_store::{
    BatchMember, MarkDoneOutcome, OrchestrationRecord, OrchestrationStatus, Store,
};

use crate::dispatcher::Dispatcher;
use crate::errors::Result;
use crate::events::{CompletionDetail, CompletionEvent};
use crate::registry::ToolRegistry;
use crate::transport::Transport;

/// Default system instructions: delegate aggressively, parallelise, and
/// never go back to the requester with questions.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the manager for a universal fast food \
restaurant, you need to take in an order and delegate tasks until the order has been \
delivered. When calling tools, call as many as you can at once, if tasks can be \
parallelised then they should be. Once you get the initial order you may not ask the \
user more questions and must make up requirements if your tools request them.";

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// System instructions framing every planner call.
    pub system_prompt: String,
    /// Inference parameters for planner calls.
    pub params: InferenceParams,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            params: InferenceParams::default(),
        }
    }
}

/// What handling a completion event did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Final pending task; results were folded and the planner consulted.
    /// Carries the orchestration's status after the re-plan.
    Advanced(OrchestrationStatus),
    /// The flag flipped but other tasks in the batch are still pending.
    StillPending {
        /// Tasks still pending after this event.
        remaining: u32,
    },
    /// Redelivered event for an already-done task; nothing changed.
    Duplicate,
    /// The event did not correlate to live state and was dropped.
    Dropped,
}

/// The orchestration engine.
pub struct Orchestrator {
    store: Store,
    planner: Arc<dyn Planner>,
    registry: ToolRegistry,
    dispatcher: Dispatcher,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Assemble an engine over shared infrastructure.
    #[must_use]
    pub fn new(
        store: Store,
        planner: Arc<dyn Planner>,
        transport: Arc<dyn Transport>,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = ToolRegistry::new(store.clone());
        let dispatcher = Dispatcher::new(registry.clone(), transport);
        Self {
            store,
            planner,
            registry,
            dispatcher,
            config,
        }
    }

    /// Start a new orchestration from a free-text request.
    ///
    /// Runs the first planning step before returning, so the caller gets
    /// back an id whose state is already `Dispatched` (or `Done`, if the
    /// planner answered without delegating).
    #[instrument(skip_all)]
    pub async fn begin(&self, request_text: &str) -> Result<OrchestrationId> {
        let mut record = OrchestrationRecord::new(vec![Turn::user_text(request_text)]);
        info!(orchestration_id = %record.id, "beginning orchestration");
        self.plan_step(&mut record).await?;
        Ok(record.id)
    }

    /// Handle one inbound completion event.
    ///
    /// Safe under at-least-once delivery and arbitrary arrival order,
    /// and resumable: completion is always re-derived from the stored
    /// flags, so a redelivered event picks up where a crashed activation
    /// left off. Exactly one activation per batch wins the fold claim
    /// and re-plans.
    #[instrument(skip_all, fields(
        orchestration_id = %event.detail.orchestration_id,
        batch_id = %event.detail.batch_id,
        node = %event.detail.node,
    ))]
    pub async fn handle_completion(&self, event: &CompletionEvent) -> Result<CompletionOutcome> {
        if !event.is_completion() {
            warn!(source = %event.source, "ignoring event from foreign source");
            return Ok(CompletionOutcome::Dropped);
        }
        let detail = &event.detail;

        let Some(mut record) = self.store.load_orchestration(&detail.orchestration_id)? else {
            warn!("completion event for unknown orchestration, dropping");
            return Ok(CompletionOutcome::Dropped);
        };
        if record.outstanding_batch.as_ref() != Some(&detail.batch_id) {
            return self.resume_if_interrupted(&mut record, detail).await;
        }

        let outcome = self
            .store
            .mark_done(&detail.batch_id, &detail.node, &detail.data)?;
        match outcome {
            MarkDoneOutcome::StillPending { remaining } => {
                debug!(remaining, "batch still pending");
                Ok(CompletionOutcome::StillPending { remaining })
            }
            MarkDoneOutcome::Completed => {
                info!("batch complete, folding results and re-planning");
                self.fold_and_replan(&mut record, &detail.batch_id).await
            }
            MarkDoneOutcome::Duplicate => {
                // A previous activation may have committed the final flag
                // and then died before folding. Re-derive completion from
                // the stored flags instead of trusting this outcome alone.
                let all_done = self
                    .store
                    .read_batch(&detail.batch_id)?
                    .iter()
                    .all(|row| row.done);
                if all_done {
                    info!("redelivered event found a fully-done batch, folding");
                    self.fold_and_replan(&mut record, &detail.batch_id).await
                } else {
                    debug!("duplicate completion, already recorded");
                    Ok(CompletionOutcome::Duplicate)
                }
            }
        }
    }

    /// Fold a completed batch's results into the conversation and, if
    /// this activation wins the claim, re-plan.
    ///
    /// The claim is a conditional update that clears the outstanding
    /// batch id only where it still matches, so of any number of racing
    /// activations exactly one persists the fold and consults the
    /// planner; the rest report `Duplicate`.
    async fn fold_and_replan(
        &self,
        record: &mut OrchestrationRecord,
        batch_id: &BatchId,
    ) -> Result<CompletionOutcome> {
        let rows = self.store.read_batch(batch_id)?;
        let results = rows
            .into_iter()
            .map(|row| ToolResultItem {
                tool_use_id: row.invocation_id,
                data: normalize_numbers(row.payload.unwrap_or(serde_json::Value::Null)),
            })
            .collect();
        record.conversation.push(Turn::user_results(results));
        record.outstanding_batch = None;
        record.status = OrchestrationStatus::AwaitingPlan;

        if !self.store.claim_fold(record, batch_id)? {
            debug!("another activation claimed the fold");
            return Ok(CompletionOutcome::Duplicate);
        }
        self.plan_step(record).await?;
        Ok(CompletionOutcome::Advanced(record.status))
    }

    /// Handle an event whose batch is no longer outstanding.
    ///
    /// If a prior activation won the fold but died before its planning
    /// step persisted, the record sits at `AwaitingPlan` with this
    /// invocation's result already folded into its last turn; pick the
    /// planning step back up. Anything else is stale and dropped.
    async fn resume_if_interrupted(
        &self,
        record: &mut OrchestrationRecord,
        detail: &CompletionDetail,
    ) -> Result<CompletionOutcome> {
        let folded_here = record.status == OrchestrationStatus::AwaitingPlan
            && record.outstanding_batch.is_none()
            && record.conversation.last().is_some_and(|turn| {
                turn.content.iter().any(|item| {
                    matches!(item, ContentItem::ToolResult(r) if r.tool_use_id == detail.tool_use_id)
                })
            });
        if !folded_here {
            warn!("completion event does not match the outstanding batch, dropping");
            return Ok(CompletionOutcome::Dropped);
        }
        info!("resuming planning step interrupted after fold");
        self.plan_step(record).await?;
        Ok(CompletionOutcome::Advanced(record.status))
    }

    /// One planning step: consult the planner, append its turn, and
    /// either dispatch the requested invocations or finish.
    async fn plan_step(&self, record: &mut OrchestrationRecord) -> Result<()> {
        let tools = self.registry.specs()?;
        let reply = self
            .planner
            .plan(PlanRequest {
                system_prompt: &self.config.system_prompt,
                conversation: &record.conversation,
                tools: &tools,
                params: self.config.params,
            })
            .await?;

        match reply.stop {
            StopReason::EndTurn => self.finish(record, reply),
            StopReason::ToolUse => self.dispatch_turn(record, reply).await,
        }
    }

    fn finish(&self, record: &mut OrchestrationRecord, reply: PlannerTurn) -> Result<()> {
        record.conversation.push(reply.into_turn());
        record.status = OrchestrationStatus::Done;
        self.store.save_orchestration(record)?;
        info!(orchestration_id = %record.id, "orchestration done");
        Ok(())
    }

    async fn dispatch_turn(
        &self,
        record: &mut OrchestrationRecord,
        reply: PlannerTurn,
    ) -> Result<()> {
        let turn = reply.into_turn();
        let invocations: Vec<ToolUseItem> =
            turn.tool_uses().into_iter().cloned().collect();
        let members: Vec<BatchMember> = invocations
            .iter()
            .map(|invocation| BatchMember {
                task: invocation.name.clone(),
                invocation_id: invocation.tool_use_id.clone(),
            })
            .collect();

        // Batch and orchestration state are durable before any message
        // leaves the process.
        let batch_id = self.store.open_batch(&members)?;
        record.conversation.push(turn);
        record.outstanding_batch = Some(batch_id.clone());
        record.status = OrchestrationStatus::Dispatched;
        self.store.save_orchestration(record)?;

        let refs: Vec<&ToolUseItem> = invocations.iter().collect();
        let _ = self.dispatcher.dispatch(&record.id, &batch_id, &refs).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CompletionDetail;
    use crate::transport::InProcessTransport;
    use expediter_core::{
        ContentItem, DispatchKind, InputSchema, InvocationId, ToolDescriptor, ToolUseItem,
    };
    use expediter_planner::ScriptedPlanner;
    use serde_json::json;

    fn store_with_tools(names: &[&str]) -> Store {
        let store = Store::open_in_memory().unwrap();
        for name in names {
            let schema = InputSchema::from_json_schema(&json!({
                "type": "object",
                "properties": {"order": {"type": "string", "description": "what to make"}},
                "required": ["order"]
            }))
            .unwrap();
            store
                .upsert_tool(&ToolDescriptor {
                    name: (*name).to_owned(),
                    description: format!("{name} worker"),
                    schema,
                    kind: DispatchKind::Queue,
                    target: format!("queue://{name}"),
                })
                .unwrap();
        }
        store
    }

    fn tool_use(id: &str, name: &str) -> ContentItem {
        ContentItem::ToolUse(ToolUseItem {
            tool_use_id: InvocationId::from(id),
            name: name.into(),
            input: json!({"order": name}),
        })
    }

    fn delegating_turn(uses: Vec<ContentItem>) -> PlannerTurn {
        PlannerTurn {
            content: uses,
            stop: StopReason::ToolUse,
        }
    }

    fn final_turn(text: &str) -> PlannerTurn {
        PlannerTurn {
            content: vec![ContentItem::Text(text.into())],
            stop: StopReason::EndTurn,
        }
    }

    fn engine(store: &Store, planner: ScriptedPlanner) -> (Orchestrator, Arc<InProcessTransport>) {
        let transport = Arc::new(InProcessTransport::new());
        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(planner),
            transport.clone(),
            OrchestratorConfig::default(),
        );
        (orchestrator, transport)
    }

    fn completion(message: &crate::transport::DispatchMessage, data: serde_json::Value)
    -> CompletionEvent {
        CompletionEvent::new(CompletionDetail {
            orchestration_id: message.orchestration_id.clone(),
            batch_id: message.batch_id.clone(),
            tool_use_id: message.tool_use_id.clone(),
            node: message.node.clone(),
            data,
        })
    }

    #[tokio::test]
    async fn burger_order_end_to_end() {
        // Turn 1: delegate to the cook; turn 2: final answer.
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([
            delegating_turn(vec![tool_use("t1", "cook_burger")]),
            final_turn("Your burger is ready."),
        ]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("one plain burger please").await.unwrap();
        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::Dispatched);

        let messages = transport.drain("queue://cook_burger");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].node, "cook_burger");

        let outcome = orchestrator
            .handle_completion(&completion(&messages[0], json!("burger: bun, patty")))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Advanced(OrchestrationStatus::Done));

        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::Done);
        assert!(record.outstanding_batch.is_none());
        // user request, assistant delegation, folded results, final answer
        assert_eq!(record.conversation.len(), 4);
        assert_eq!(
            record.conversation[3].content,
            vec![ContentItem::Text("Your burger is ready.".into())]
        );
        match &record.conversation[2].content[0] {
            ContentItem::ToolResult(result) => {
                assert_eq!(result.tool_use_id.as_str(), "t1");
                assert_eq!(result.data, json!("burger: bun, patty"));
            }
            other => panic!("expected folded tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reverse_order_completion_folds_once() {
        let store = store_with_tools(&["cook_burger", "fry_fries"]);
        let planner = ScriptedPlanner::new([
            delegating_turn(vec![
                tool_use("t1", "cook_burger"),
                tool_use("t2", "fry_fries"),
            ]),
            final_turn("Order up."),
        ]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("burger and fries").await.unwrap();
        let burger = transport.drain("queue://cook_burger").remove(0);
        let fries = transport.drain("queue://fry_fries").remove(0);

        // Second-dispatched task completes first.
        let first = orchestrator
            .handle_completion(&completion(&fries, json!("fries done")))
            .await
            .unwrap();
        assert_eq!(first, CompletionOutcome::StillPending { remaining: 1 });

        let second = orchestrator
            .handle_completion(&completion(&burger, json!("burger done")))
            .await
            .unwrap();
        assert_eq!(second, CompletionOutcome::Advanced(OrchestrationStatus::Done));

        let record = store.load_orchestration(&id).unwrap().unwrap();
        let results = &record.conversation[2];
        assert_eq!(results.content.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_completion_is_dropped_without_replanning() {
        let store = store_with_tools(&["cook_burger", "fry_fries"]);
        let planner = ScriptedPlanner::new([delegating_turn(vec![
            tool_use("t1", "cook_burger"),
            tool_use("t2", "fry_fries"),
        ])]);
        let (orchestrator, transport) = engine(&store, planner);

        let _ = orchestrator.begin("burger and fries").await.unwrap();
        let burger = transport.drain("queue://cook_burger").remove(0);

        let first = orchestrator
            .handle_completion(&completion(&burger, json!("v1")))
            .await
            .unwrap();
        assert_eq!(first, CompletionOutcome::StillPending { remaining: 1 });

        // Redelivery neither flips state nor consumes a planner turn.
        let again = orchestrator
            .handle_completion(&completion(&burger, json!("v2")))
            .await
            .unwrap();
        assert_eq!(again, CompletionOutcome::Duplicate);
    }

    #[tokio::test]
    async fn unknown_tool_stalls_the_batch() {
        // Planner requests a registered and an unregistered tool. The
        // unregistered one is never dispatched, so the batch cannot
        // complete even after the registered one finishes.
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([delegating_turn(vec![
            tool_use("t1", "cook_burger"),
            tool_use("t2", "summon_chef"),
        ])]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("burger with a show").await.unwrap();
        assert!(transport.drain("queue://summon_chef").is_empty());
        let burger = transport.drain("queue://cook_burger").remove(0);

        let outcome = orchestrator
            .handle_completion(&completion(&burger, json!("done")))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::StillPending { remaining: 1 });

        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::Dispatched);
        assert!(record.outstanding_batch.is_some());
    }

    #[tokio::test]
    async fn stale_or_unknown_events_are_dropped() {
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([delegating_turn(vec![tool_use("t1", "cook_burger")])]);
        let (orchestrator, transport) = engine(&store, planner);

        let _ = orchestrator.begin("one burger").await.unwrap();
        let message = transport.drain("queue://cook_burger").remove(0);

        // Unknown orchestration.
        let mut forged = completion(&message, json!(null));
        forged.detail.orchestration_id = OrchestrationId::from("ghost");
        let outcome = orchestrator.handle_completion(&forged).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Dropped);

        // Known orchestration, wrong batch.
        let mut stale = completion(&message, json!(null));
        stale.detail.batch_id = BatchId::from("long-gone");
        let outcome = orchestrator.handle_completion(&stale).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Dropped);

        // Foreign envelope source.
        let mut foreign = completion(&message, json!(null));
        foreign.source = "meal.request".into();
        let outcome = orchestrator.handle_completion(&foreign).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Dropped);
    }

    #[tokio::test]
    async fn numeric_payloads_are_normalized_when_folded() {
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([
            delegating_turn(vec![tool_use("t1", "cook_burger")]),
            final_turn("done"),
        ]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("one burger").await.unwrap();
        let message = transport.drain("queue://cook_burger").remove(0);

        let _ = orchestrator
            .handle_completion(&completion(
                &message,
                json!({"patties": 2.0, "doneness": 0.75}),
            ))
            .await
            .unwrap();

        let record = store.load_orchestration(&id).unwrap().unwrap();
        match &record.conversation[2].content[0] {
            ContentItem::ToolResult(result) => {
                assert_eq!(result.data, json!({"patties": 2, "doneness": 0.75}));
                assert!(result.data["patties"].is_i64());
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn immediate_answer_needs_no_dispatch() {
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([final_turn("We are closed.")]);
        let (orchestrator, _transport) = engine(&store, planner);

        let id = orchestrator.begin("one burger").await.unwrap();
        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::Done);
        assert!(record.outstanding_batch.is_none());
        assert_eq!(record.conversation.len(), 2);
    }

    #[tokio::test]
    async fn chained_steps_dispatch_again_before_finishing() {
        // The cook finishes first; the planner then hands the order to
        // the front counter before giving the final answer.
        let store = store_with_tools(&["cook_burger", "front_counter"]);
        let planner = ScriptedPlanner::new([
            delegating_turn(vec![tool_use("t1", "cook_burger")]),
            delegating_turn(vec![tool_use("t2", "front_counter")]),
            final_turn("Order served."),
        ]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("one burger, served hot").await.unwrap();
        let cooked = transport.drain("queue://cook_burger").remove(0);

        let outcome = orchestrator
            .handle_completion(&completion(&cooked, json!("burger ready")))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Advanced(OrchestrationStatus::Dispatched)
        );

        // Re-planning opened a fresh batch for the next delegation.
        let served = transport.drain("queue://front_counter").remove(0);
        assert_ne!(served.batch_id, cooked.batch_id);
        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.outstanding_batch, Some(served.batch_id.clone()));

        let outcome = orchestrator
            .handle_completion(&completion(&served, json!("handed over")))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Advanced(OrchestrationStatus::Done));

        let record = store.load_orchestration(&id).unwrap().unwrap();
        // request, delegation, results, delegation, results, final answer
        assert_eq!(record.conversation.len(), 6);
        assert_eq!(
            record.conversation[5].content,
            vec![ContentItem::Text("Order served.".into())]
        );
    }

    #[tokio::test]
    async fn redelivery_resumes_after_planner_failure() {
        // The planner errors out after the fold has been persisted. The
        // redelivered event must not be swallowed as a duplicate: a later
        // activation picks the planning step back up.
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([delegating_turn(vec![tool_use("t1", "cook_burger")])]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("one burger").await.unwrap();
        let message = transport.drain("queue://cook_burger").remove(0);

        // Script is exhausted, so the re-plan inside handling fails, but
        // only after the fold was committed.
        let event = completion(&message, json!("ready"));
        assert!(orchestrator.handle_completion(&event).await.is_err());
        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::AwaitingPlan);
        assert!(record.outstanding_batch.is_none());
        assert_eq!(record.conversation.len(), 3);

        // A fresh activation, sharing only the database, handles the
        // redelivery and finishes the step.
        let retry_planner = ScriptedPlanner::new([final_turn("Your burger is ready.")]);
        let (retry, _transport) = engine(&store, retry_planner);
        let outcome = retry.handle_completion(&event).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Advanced(OrchestrationStatus::Done));

        let record = store.load_orchestration(&id).unwrap().unwrap();
        assert_eq!(record.status, OrchestrationStatus::Done);
        assert_eq!(record.conversation.len(), 4);
    }

    #[tokio::test]
    async fn redelivery_folds_a_batch_left_fully_done() {
        // An activation flips the final flag and dies before folding. The
        // redelivered event sees a duplicate flag but a fully-done batch,
        // and must carry the fold and re-plan through.
        let store = store_with_tools(&["cook_burger"]);
        let planner = ScriptedPlanner::new([
            delegating_turn(vec![tool_use("t1", "cook_burger")]),
            final_turn("done"),
        ]);
        let (orchestrator, transport) = engine(&store, planner);

        let id = orchestrator.begin("one burger").await.unwrap();
        let message = transport.drain("queue://cook_burger").remove(0);

        let flipped = store
            .mark_done(&message.batch_id, &message.node, &json!("ready"))
            .unwrap();
        assert_eq!(flipped, MarkDoneOutcome::Completed);

        let outcome = orchestrator
            .handle_completion(&completion(&message, json!("ignored rerun payload")))
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Advanced(OrchestrationStatus::Done));

        // The fold used the payload recorded by the first delivery.
        let record = store.load_orchestration(&id).unwrap().unwrap();
        match &record.conversation[2].content[0] {
            ContentItem::ToolResult(result) => assert_eq!(result.data, json!("ready")),
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn planner_sees_folded_results_on_replan() {
        let store = store_with_tools(&["cook_burger"]);
        let scripted = ScriptedPlanner::new([
            delegating_turn(vec![tool_use("t1", "cook_burger")]),
            final_turn("done"),
        ]);
        let transport = Arc::new(InProcessTransport::new());
        let planner = Arc::new(scripted);
        let orchestrator = Orchestrator::new(
            store.clone(),
            planner.clone(),
            transport.clone(),
            OrchestratorConfig::default(),
        );

        let _ = orchestrator.begin("one burger").await.unwrap();
        let message = transport.drain("queue://cook_burger").remove(0);
        let _ = orchestrator
            .handle_completion(&completion(&message, json!("ready")))
            .await
            .unwrap();

        let requests = planner.requests();
        assert_eq!(requests.len(), 2);
        // Re-plan request ends with the folded results turn.
        let last_turn = requests[1].last().unwrap();
        assert!(matches!(last_turn.content[0], ContentItem::ToolResult(_)));
    }
}
