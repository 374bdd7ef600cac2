//! Tool descriptors and registration records.
//!
//! A [`ToolDescriptor`] is the registry's view of one task type: its
//! unique name, description, validated input schema, and dispatch
//! target (the queue its invocations are published to). Descriptors are
//! created from externally-submitted [`RegistrationRecord`]s — the same
//! write path a fabricated worker uses to self-register.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schema::{InputSchema, SchemaError};

/// Errors raised while validating a registration record.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The record carried an empty tool name.
    #[error("registration record has an empty tool name")]
    EmptyName,

    /// The dispatch action type is not one the engine can publish to.
    #[error("unknown dispatch kind {0:?}")]
    UnknownDispatchKind(String),

    /// The input schema blob failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// How invocations of a tool are delivered to its worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// Publish the invocation message onto the tool's target queue.
    Queue,
}

impl DispatchKind {
    /// Parse a registration record's `action.type` string.
    ///
    /// Accepts `"sqs"` for compatibility with records written by older
    /// registrars.
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "queue" | "sqs" => Some(Self::Queue),
            _ => None,
        }
    }
}

/// Registry entry for one task type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Globally unique tool name.
    pub name: String,
    /// Human/planner-readable description.
    pub description: String,
    /// Validated input schema.
    pub schema: InputSchema,
    /// Delivery mechanism.
    pub kind: DispatchKind,
    /// Queue address invocations are published to.
    pub target: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration record wire format
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch action inside a registration record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationAction {
    /// Action type (`"queue"`, or legacy `"sqs"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Queue address.
    pub target: String,
}

/// The `config` body of a registration record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Tool name.
    pub name: String,
    /// Description shown to the planner.
    pub description: String,
    /// JSON-Schema-shaped input schema blob; validated on acceptance.
    pub schema: Value,
    /// Dispatch action.
    pub action: RegistrationAction,
}

/// Externally-submitted tool registration record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    /// Registry key; by convention equals `config.name`.
    pub tool_id: String,
    /// Registration body.
    pub config: RegistrationConfig,
}

impl ToolDescriptor {
    /// Validate a registration record into a descriptor.
    ///
    /// Schema validation happens here, once, so nothing downstream ever
    /// sees an untyped schema blob.
    pub fn from_registration(record: &RegistrationRecord) -> Result<Self, RegistrationError> {
        let name = if record.config.name.is_empty() {
            record.tool_id.clone()
        } else {
            record.config.name.clone()
        };
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let kind = DispatchKind::parse(&record.config.action.kind)
            .ok_or_else(|| RegistrationError::UnknownDispatchKind(record.config.action.kind.clone()))?;
        let schema = InputSchema::from_json_schema(&record.config.schema)?;
        Ok(Self {
            name,
            description: record.config.description.clone(),
            schema,
            kind,
            target: record.config.action.target.clone(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
