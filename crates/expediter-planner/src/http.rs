//! HTTP planner speaking the converse protocol.
//!
//! Request body:
//!
//! ```json
//! {
//!   "system": [{"text": "..."}],
//!   "messages": [{"role": "user", "content": [{"text": "..."}]}],
//!   "toolConfig": {"tools": [{"toolSpec": {"name", "description", "inputSchema": {"json": {...}}}}]},
//!   "inferenceConfig": {"maxTokens": 4096, "temperature": 0.0}
//! }
//! ```
//!
//! Response body:
//!
//! ```json
//! {
//!   "output": {"message": {"role": "assistant", "content": [...]}},
//!   "stopReason": "tool_use" | "end_turn"
//! }
//! ```
//!
//! Content items use the same wire tags as [`expediter_core::ContentItem`],
//! so the response message deserializes straight into conversation types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use async_trait::async_trait;
use expediter_core::Turn;

use crate::planner::{
    PlanRequest, Planner, PlannerError, PlannerResult, PlannerTurn, StopReason, ToolSpec,
};

/// Planner backed by a converse-protocol HTTP endpoint.
pub struct HttpPlanner {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
}

impl HttpPlanner {
    /// Create a planner for `endpoint` (base URL) and `model_id`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model_id: model_id.into(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/model/{}/converse",
            self.endpoint.trim_end_matches('/'),
            self.model_id
        )
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    #[instrument(skip_all, fields(model_id = %self.model_id, turns = request.conversation.len()))]
    async fn plan(&self, request: PlanRequest<'_>) -> PlannerResult<PlannerTurn> {
        let body = ConverseRequest::build(&request);
        let response = self.client.post(self.url()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlannerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ConverseResponse = response.json().await?;
        debug!(stop_reason = ?reply.stop_reason, "planner replied");
        reply.into_planner_turn()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SystemBlock<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireToolSpec<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: InputSchemaBlock<'a>,
}

#[derive(Serialize)]
struct InputSchemaBlock<'a> {
    json: &'a Value,
}

#[derive(Serialize)]
struct ToolEntry<'a> {
    #[serde(rename = "toolSpec")]
    tool_spec: WireToolSpec<'a>,
}

#[derive(Serialize)]
struct ToolConfig<'a> {
    tools: Vec<ToolEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    system: Vec<SystemBlock<'a>>,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig<'a>>,
    inference_config: InferenceConfig,
}

impl<'a> ConverseRequest<'a> {
    fn build(request: &'a PlanRequest<'a>) -> Self {
        let tool_config = if request.tools.is_empty() {
            None
        } else {
            Some(ToolConfig {
                tools: request.tools.iter().map(ToolEntry::from_spec).collect(),
            })
        };
        Self {
            system: vec![SystemBlock {
                text: request.system_prompt,
            }],
            messages: request.conversation,
            tool_config,
            inference_config: InferenceConfig {
                max_tokens: request.params.max_tokens,
                temperature: request.params.temperature,
            },
        }
    }
}

impl<'a> ToolEntry<'a> {
    fn from_spec(spec: &'a ToolSpec) -> Self {
        Self {
            tool_spec: WireToolSpec {
                name: &spec.name,
                description: &spec.description,
                input_schema: InputSchemaBlock {
                    json: &spec.input_schema,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(rename = "stopReason")]
    stop_reason: String,
}

#[derive(Deserialize)]
struct ConverseOutput {
    message: Turn,
}

impl ConverseResponse {
    fn into_planner_turn(self) -> PlannerResult<PlannerTurn> {
        let stop = match self.stop_reason.as_str() {
            "tool_use" => StopReason::ToolUse,
            "end_turn" | "stop_sequence" | "max_tokens" => StopReason::EndTurn,
            other => {
                return Err(PlannerError::MalformedResponse {
                    message: format!("unknown stop reason {other:?}"),
                });
            }
        };
        if self.output.message.content.is_empty() {
            return Err(PlannerError::MalformedResponse {
                message: "assistant turn has no content".into(),
            });
        }
        if stop == StopReason::ToolUse && !self.output.message.has_tool_uses() {
            return Err(PlannerError::MalformedResponse {
                message: "stop reason tool_use but no toolUse items".into(),
            });
        }
        Ok(PlannerTurn {
            content: self.output.message.content,
            stop,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::InferenceParams;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn request_body_matches_converse_shape() {
        let conversation = vec![Turn::user_text("one burger please")];
        let tools = vec![ToolSpec {
            name: "cook_burger".into(),
            description: "Cooks burgers".into(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        }];
        let request = PlanRequest {
            system_prompt: "You are the shift manager.",
            conversation: &conversation,
            tools: &tools,
            params: InferenceParams::default(),
        };
        let body = serde_json::to_value(ConverseRequest::build(&request)).unwrap();
        assert_eq!(body["system"], json!([{"text": "You are the shift manager."}]));
        assert_eq!(
            body["messages"],
            json!([{"role": "user", "content": [{"text": "one burger please"}]}])
        );
        assert_eq!(body["toolConfig"]["tools"][0]["toolSpec"]["name"], "cook_burger");
        assert_eq!(
            body["toolConfig"]["tools"][0]["toolSpec"]["inputSchema"]["json"]["type"],
            "object"
        );
        assert_eq!(body["inferenceConfig"], json!({"maxTokens": 4096, "temperature": 0.0}));
    }

    #[test]
    fn empty_catalog_omits_tool_config() {
        let conversation = vec![Turn::user_text("hello")];
        let request = PlanRequest {
            system_prompt: "sys",
            conversation: &conversation,
            tools: &[],
            params: InferenceParams::default(),
        };
        let body = serde_json::to_value(ConverseRequest::build(&request)).unwrap();
        assert!(body.get("toolConfig").is_none());
    }

    #[test]
    fn response_parses_tool_use_turn() {
        let reply: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [
                {"toolUse": {"toolUseId": "t1", "name": "cook_burger", "input": {"burgerOrder": "plain"}}}
            ]}},
            "stopReason": "tool_use"
        }))
        .unwrap();
        let turn = reply.into_planner_turn().unwrap();
        assert_eq!(turn.stop, StopReason::ToolUse);
        assert_eq!(turn.content.len(), 1);
    }

    #[test]
    fn response_parses_final_answer() {
        let reply: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "order up"}]}},
            "stopReason": "end_turn"
        }))
        .unwrap();
        let turn = reply.into_planner_turn().unwrap();
        assert_eq!(turn.stop, StopReason::EndTurn);
    }

    #[test]
    fn tool_use_stop_without_tool_uses_is_malformed() {
        let reply: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "hmm"}]}},
            "stopReason": "tool_use"
        }))
        .unwrap();
        let err = reply.into_planner_turn().unwrap_err();
        assert_matches!(err, PlannerError::MalformedResponse { .. });
    }

    #[test]
    fn unknown_stop_reason_is_malformed() {
        let reply: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "x"}]}},
            "stopReason": "content_filtered"
        }))
        .unwrap();
        let err = reply.into_planner_turn().unwrap_err();
        assert_matches!(err, PlannerError::MalformedResponse { .. });
    }
}
