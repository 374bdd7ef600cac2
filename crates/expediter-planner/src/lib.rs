//! # expediter-planner
//!
//! The planner oracle: given the conversation so far and the catalog of
//! registered tools, it returns the next assistant turn — either a batch
//! of task invocations to dispatch or a final text answer.
//!
//! [`Planner`] is the seam. [`HttpPlanner`] speaks the converse-style
//! HTTP protocol to a real model endpoint; [`ScriptedPlanner`] replays
//! canned turns for tests.

#![deny(unsafe_code)]

pub mod http;
pub mod planner;
pub mod scripted;

pub use http::HttpPlanner;
pub use planner::{
    InferenceParams, PlanRequest, Planner, PlannerError, PlannerResult, PlannerTurn, StopReason,
    ToolSpec,
};
pub use scripted::ScriptedPlanner;
