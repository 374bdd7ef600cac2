//! Planner trait and request/response types.
//!
//! The engine never constructs model-specific payloads; it hands the
//! planner a [`PlanRequest`] built from durable state and gets back a
//! [`PlannerTurn`]. Anything that can answer that contract can drive an
//! orchestration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use expediter_core::{ContentItem, ToolDescriptor, Turn};

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors that can occur while consulting the planner.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The response parsed but did not contain a usable assistant turn.
    #[error("malformed planner response: {message}")]
    MalformedResponse {
        /// What was missing or wrong.
        message: String,
    },

    /// A scripted planner ran out of turns.
    #[error("scripted planner has no more turns")]
    ScriptExhausted,
}

impl PlannerError {
    /// Whether this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::MalformedResponse { .. } | Self::ScriptExhausted => false,
        }
    }
}

/// Why the planner stopped producing content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The turn requests task invocations; dispatch them and wait.
    ToolUse,
    /// The turn is the final answer.
    EndTurn,
}

/// Inference parameters passed through to the model endpoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InferenceParams {
    /// Token cap for the planner's reply.
    pub max_tokens: u32,
    /// Sampling temperature. Zero keeps plans deterministic.
    pub temperature: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// A tool rendered for the planner's catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, as invocable by the planner.
    pub name: String,
    /// Description shown to the planner.
    pub description: String,
    /// JSON-Schema form of the tool's input.
    pub input_schema: Value,
}

impl ToolSpec {
    /// Render a registry descriptor into planner-catalog form.
    #[must_use]
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.schema.to_json_schema(),
        }
    }
}

/// One planning request.
#[derive(Debug)]
pub struct PlanRequest<'a> {
    /// System prompt framing the planner's role.
    pub system_prompt: &'a str,
    /// Full conversation so far, oldest turn first.
    pub conversation: &'a [Turn],
    /// Catalog of invocable tools.
    pub tools: &'a [ToolSpec],
    /// Inference parameters.
    pub params: InferenceParams,
}

/// The planner's reply: one assistant turn plus its stop reason.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerTurn {
    /// Assistant content items (text and/or tool uses).
    pub content: Vec<ContentItem>,
    /// Why the planner stopped.
    pub stop: StopReason,
}

impl PlannerTurn {
    /// Convert into a conversation turn.
    #[must_use]
    pub fn into_turn(self) -> Turn {
        Turn::assistant(self.content)
    }
}

/// The planning oracle.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produce the next assistant turn for a conversation.
    async fn plan(&self, request: PlanRequest<'_>) -> PlannerResult<PlannerTurn>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use expediter_core::InputSchema;
    use serde_json::json;

    #[test]
    fn tool_spec_from_descriptor_renders_json_schema() {
        let schema = InputSchema::from_json_schema(&json!({
            "type": "object",
            "properties": {
                "burgerOrder": {"type": "string", "description": "the burger"}
            },
            "required": ["burgerOrder"]
        }))
        .unwrap();
        let descriptor = ToolDescriptor {
            name: "cook_burger".into(),
            description: "Cooks burgers".into(),
            schema,
            kind: expediter_core::DispatchKind::Queue,
            target: "queue://burger".into(),
        };
        let spec = ToolSpec::from_descriptor(&descriptor);
        assert_eq!(spec.name, "cook_burger");
        assert_eq!(spec.input_schema["type"], "object");
        assert_eq!(spec.input_schema["required"], json!(["burgerOrder"]));
    }

    #[test]
    fn api_5xx_is_retryable_but_malformed_is_not() {
        let api = PlannerError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(api.is_retryable());
        let bad = PlannerError::MalformedResponse {
            message: "no content".into(),
        };
        assert!(!bad.is_retryable());
    }
}
