//! Engine error type.

use expediter_planner::PlannerError;
use expediter_store::StoreError;

use crate::transport::TransportError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the orchestration engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Durable store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Planner consultation failed; the orchestration remains at its
    /// last persisted state and can be resumed.
    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// Dispatch transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
