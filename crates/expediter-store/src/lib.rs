//! # expediter-store
//!
//! Durable `SQLite` store for the orchestration engine. This is where the
//! engine's durability invariants live:
//!
//! - **Orchestrations**: one row per in-flight request — conversation
//!   history, status, and the id of the outstanding tracking batch.
//! - **Tracking batches**: one pending flag per dispatched task; the
//!   mark-done path is a single transaction, so exactly one concurrent
//!   completion observes "batch now complete".
//! - **Tool registry**: validated descriptors keyed by tool name.
//!
//! Activations on different processes share nothing but this database;
//! every write method leaves the store in a state any later activation
//! can resume from.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod store;
pub mod types;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
pub use repositories::BatchMember;
pub use store::Store;
pub use types::{BatchTaskRow, MarkDoneOutcome, OrchestrationRecord, OrchestrationStatus};
