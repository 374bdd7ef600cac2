//! Conversation model — the history exchanged with the planner.
//!
//! A conversation is an ordered sequence of [`Turn`]s. Each turn has a
//! role and a list of content items: plain text, a task invocation the
//! planner requested (`toolUse`), or an aggregated task result fed back
//! to the planner (`toolResult`). The serialized form is the wire format
//! sent to the planner, so field names matter and are pinned here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::InvocationId;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The requester, or the engine feeding task results back.
    User,
    /// The planner.
    Assistant,
}

/// A task invocation requested by the planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseItem {
    /// Invocation ID, unique per requested invocation.
    pub tool_use_id: InvocationId,
    /// Task (tool) name to invoke.
    pub name: String,
    /// Structured input for the task.
    pub input: Value,
}

/// One task's result, tagged with the invocation that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultItem {
    /// The originating invocation ID, for planner-side correlation.
    pub tool_use_id: InvocationId,
    /// The task's completion payload.
    pub data: Value,
}

/// A single content item within a turn.
///
/// Externally tagged so the wire form reads `{"text": ...}`,
/// `{"toolUse": {...}}`, `{"toolResult": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContentItem {
    /// Plain text.
    #[serde(rename = "text")]
    Text(String),
    /// A task invocation requested by the planner.
    #[serde(rename = "toolUse")]
    ToolUse(ToolUseItem),
    /// A completed task's result.
    #[serde(rename = "toolResult")]
    ToolResult(ToolResultItem),
}

impl ContentItem {
    /// The invocation if this item is a `toolUse`.
    #[must_use]
    pub fn as_tool_use(&self) -> Option<&ToolUseItem> {
        match self {
            Self::ToolUse(item) => Some(item),
            Self::Text(_) | Self::ToolResult(_) => None,
        }
    }
}

/// One turn of the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn.
    pub role: Role,
    /// Ordered content items.
    pub content: Vec<ContentItem>,
}

impl Turn {
    /// A user turn containing a single text item (the initial request).
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentItem::Text(text.into())],
        }
    }

    /// A user turn carrying one aggregated batch of task results.
    #[must_use]
    pub fn user_results(results: Vec<ToolResultItem>) -> Self {
        Self {
            role: Role::User,
            content: results.into_iter().map(ContentItem::ToolResult).collect(),
        }
    }

    /// An assistant turn with arbitrary content.
    #[must_use]
    pub fn assistant(content: Vec<ContentItem>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// All task invocations requested in this turn, in order.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<&ToolUseItem> {
        self.content
            .iter()
            .filter_map(ContentItem::as_tool_use)
            .collect()
    }

    /// Whether this turn requests any task invocations.
    #[must_use]
    pub fn has_tool_uses(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, ContentItem::ToolUse(_)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
