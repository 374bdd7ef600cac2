//! Typed tool input schemas.
//!
//! Registration records arrive with a JSON-Schema-shaped blob describing
//! a tool's input. That blob is parsed and validated once, at
//! registration time, into [`InputSchema`] — a field map of
//! `{type, required, description}` — and never passed around untyped.
//! The planner-facing JSON-Schema rendering is derived from the typed
//! form on demand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Errors raised while validating a registration schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The top-level schema was not `{"type": "object", ...}`.
    #[error("schema must be a JSON object with type \"object\"")]
    NotAnObject,

    /// A property was missing its `type` field.
    #[error("property {field} has no type")]
    MissingType {
        /// Property name.
        field: String,
    },

    /// A property declared a type outside the supported set.
    #[error("property {field} has unsupported type {declared}")]
    UnsupportedType {
        /// Property name.
        field: String,
        /// The declared type string.
        declared: String,
    },

    /// `required` listed a name with no matching property.
    #[error("required field {0} is not a declared property")]
    UnknownRequired(String),
}

/// JSON type of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Number,
    /// Boolean.
    Boolean,
    /// Nested object (opaque to the engine).
    Object,
    /// Array (opaque to the engine).
    Array,
}

impl FieldType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    fn as_json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// One field of a tool's input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// JSON type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the planner must supply this field.
    pub required: bool,
    /// Human/planner-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A tool's validated input schema: field name → spec.
///
/// `BTreeMap` keeps rendering deterministic, which keeps the planner
/// request body stable across activations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSchema {
    /// Field specs keyed by field name.
    pub fields: BTreeMap<String, FieldSpec>,
}

impl InputSchema {
    /// Parse and validate a JSON-Schema-shaped registration blob.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let obj = schema.as_object().ok_or(SchemaError::NotAnObject)?;
        if obj.get("type").and_then(Value::as_str) != Some("object") {
            return Err(SchemaError::NotAnObject);
        }

        let empty = Map::new();
        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for name in &required {
            if !properties.contains_key(*name) {
                return Err(SchemaError::UnknownRequired((*name).to_owned()));
            }
        }

        let mut fields = BTreeMap::new();
        for (name, prop) in properties {
            let declared = prop
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::MissingType {
                    field: name.clone(),
                })?;
            let field_type =
                FieldType::parse(declared).ok_or_else(|| SchemaError::UnsupportedType {
                    field: name.clone(),
                    declared: declared.to_owned(),
                })?;
            let _ = fields.insert(
                name.clone(),
                FieldSpec {
                    field_type,
                    required: required.contains(&name.as_str()),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                },
            );
        }

        Ok(Self { fields })
    }

    /// Render the planner-facing JSON-Schema form.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            let mut prop = Map::new();
            let _ = prop.insert("type".into(), json!(spec.field_type.as_json_type()));
            if let Some(desc) = &spec.description {
                let _ = prop.insert("description".into(), json!(desc));
            }
            let _ = properties.insert(name.clone(), Value::Object(prop));
            if spec.required {
                required.push(json!(name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
