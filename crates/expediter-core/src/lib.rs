//! # expediter-core
//!
//! Foundation types shared by every Expediter crate:
//!
//! - **Branded IDs**: `OrchestrationId`, `BatchId`, `InvocationId` as newtypes
//! - **Conversation**: `Turn` / `ContentItem` — the history exchanged with the planner
//! - **Tool schemas**: `ToolDescriptor` with a typed, registration-validated input schema
//! - **Normalization**: `normalize_numbers` for numeric payloads read back from storage

#![deny(unsafe_code)]

pub mod conversation;
pub mod ids;
pub mod normalize;
pub mod schema;
pub mod tools;

pub use conversation::{ContentItem, Role, ToolResultItem, ToolUseItem, Turn};
pub use ids::{BatchId, InvocationId, OrchestrationId};
pub use normalize::normalize_numbers;
pub use schema::{FieldSpec, FieldType, InputSchema, SchemaError};
pub use tools::{DispatchKind, RegistrationRecord, ToolDescriptor};
