//! Scripted planner for tests.
//!
//! Replays a fixed queue of turns in order, recording each request's
//! conversation so tests can assert what the engine actually sent.

use parking_lot::Mutex;
use std::collections::VecDeque;

use async_trait::async_trait;
use expediter_core::Turn;

use crate::planner::{PlanRequest, Planner, PlannerError, PlannerResult, PlannerTurn};

/// Planner that replays canned turns.
#[derive(Default)]
pub struct ScriptedPlanner {
    turns: Mutex<VecDeque<PlannerTurn>>,
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedPlanner {
    /// Create a planner that will reply with `turns`, in order.
    #[must_use]
    pub fn new(turns: impl IntoIterator<Item = PlannerTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far, one per `plan` call.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().clone()
    }

    /// Number of scripted turns not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.turns.lock().len()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, request: PlanRequest<'_>) -> PlannerResult<PlannerTurn> {
        self.requests.lock().push(request.conversation.to_vec());
        self.turns
            .lock()
            .pop_front()
            .ok_or(PlannerError::ScriptExhausted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{InferenceParams, StopReason};
    use assert_matches::assert_matches;
    use expediter_core::ContentItem;

    fn request(conversation: &[Turn]) -> PlanRequest<'_> {
        PlanRequest {
            system_prompt: "sys",
            conversation,
            tools: &[],
            params: InferenceParams::default(),
        }
    }

    #[tokio::test]
    async fn replays_turns_in_order_then_exhausts() {
        let planner = ScriptedPlanner::new([
            PlannerTurn {
                content: vec![ContentItem::Text("first".into())],
                stop: StopReason::EndTurn,
            },
            PlannerTurn {
                content: vec![ContentItem::Text("second".into())],
                stop: StopReason::EndTurn,
            },
        ]);
        let conversation = vec![Turn::user_text("hi")];

        let first = planner.plan(request(&conversation)).await.unwrap();
        assert_eq!(first.content, vec![ContentItem::Text("first".into())]);
        let second = planner.plan(request(&conversation)).await.unwrap();
        assert_eq!(second.content, vec![ContentItem::Text("second".into())]);

        let err = planner.plan(request(&conversation)).await.unwrap_err();
        assert_matches!(err, PlannerError::ScriptExhausted);
    }

    #[tokio::test]
    async fn records_each_request_conversation() {
        let planner = ScriptedPlanner::new([PlannerTurn {
            content: vec![ContentItem::Text("ok".into())],
            stop: StopReason::EndTurn,
        }]);
        let conversation = vec![Turn::user_text("order fries")];
        let _ = planner.plan(request(&conversation)).await.unwrap();

        let seen = planner.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], conversation);
    }
}
