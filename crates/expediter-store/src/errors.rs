//! Error types for the store subsystem.
//!
//! [`StoreError`] is the primary error type returned by all store
//! operations, with specific variants for the completion-path conditions
//! the orchestrator must tell apart (missing batch, unknown task, empty
//! batch) so they can be logged and dropped rather than crash an
//! activation.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested orchestration was not found.
    #[error("orchestration not found: {0}")]
    OrchestrationNotFound(String),

    /// A completion event referenced a batch with no record.
    #[error("batch not found: {0}")]
    BatchNotFound(String),

    /// A completion event named a task that is not part of its batch.
    #[error("task {task} is not a member of batch {batch}")]
    UnknownTask {
        /// Batch id.
        batch: String,
        /// Task name from the event.
        task: String,
    },

    /// Refused to open a batch with no member tasks.
    ///
    /// An empty batch could never complete and would stall its
    /// orchestration invisibly.
    #[error("cannot open an empty tracking batch")]
    EmptyBatch,

    /// Stored row contained data that no longer parses.
    #[error("corrupt row in {table}: {message}")]
    CorruptRow {
        /// Table the row came from.
        table: String,
        /// What failed to parse.
        message: String,
    },
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
