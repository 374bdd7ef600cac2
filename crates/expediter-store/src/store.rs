//! Store facade — the single durable surface the engine talks to.
//!
//! Owns the connection pool and runs migrations at open. Repositories
//! are stateless; the facade checks a connection out of the pool per
//! call and hands it down.

use serde_json::Value;
use tracing::{debug, info};

use expediter_core::{BatchId, OrchestrationId, ToolDescriptor};

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::migrations::run_migrations;
use crate::repositories::{BatchMember, BatchRepo, OrchestrationRepo, ToolRepo};
use crate::types::{BatchTaskRow, MarkDoneOutcome, OrchestrationRecord};

/// Durable store for orchestrations, batches, and the tool registry.
#[derive(Clone)]
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Open a file-backed store, creating and migrating the database.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        let store = Self { pool };
        let conn = store.conn()?;
        let applied = run_migrations(&conn)?;
        if applied > 0 {
            info!(path, applied, "applied schema migrations");
        }
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        let store = Self { pool };
        let conn = store.conn()?;
        let _ = run_migrations(&conn)?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─── Orchestrations ──────────────────────────────────────────────────────

    /// Persist an orchestration record (insert or update by id).
    pub fn save_orchestration(&self, record: &OrchestrationRecord) -> Result<()> {
        debug!(orchestration_id = %record.id, status = record.status.as_str(), "saving orchestration");
        let conn = self.conn()?;
        OrchestrationRepo::save(&conn, record)
    }

    /// Load an orchestration by id.
    pub fn load_orchestration(&self, id: &OrchestrationId) -> Result<Option<OrchestrationRecord>> {
        let conn = self.conn()?;
        OrchestrationRepo::get_by_id(&conn, id)
    }

    /// Atomically fold a completed batch: persist `record` and clear its
    /// outstanding batch, but only if `batch_id` is still the outstanding
    /// one. Returns whether this caller won the fold.
    ///
    /// See [`OrchestrationRepo::claim_fold`].
    pub fn claim_fold(&self, record: &OrchestrationRecord, batch_id: &BatchId) -> Result<bool> {
        let conn = self.conn()?;
        OrchestrationRepo::claim_fold(&conn, record, batch_id)
    }

    // ─── Batches ─────────────────────────────────────────────────────────────

    /// Create a tracking batch for a set of task invocations.
    pub fn open_batch(&self, members: &[BatchMember]) -> Result<BatchId> {
        let conn = self.conn()?;
        let id = BatchRepo::open(&conn, members)?;
        debug!(batch_id = %id, tasks = members.len(), "opened batch");
        Ok(id)
    }

    /// Record one task completion; see [`BatchRepo::mark_done`].
    pub fn mark_done(
        &self,
        batch_id: &BatchId,
        task: &str,
        payload: &Value,
    ) -> Result<MarkDoneOutcome> {
        let mut conn = self.conn()?;
        BatchRepo::mark_done(&mut conn, batch_id, task, payload)
    }

    /// Read a batch's per-task flags and payloads.
    pub fn read_batch(&self, batch_id: &BatchId) -> Result<Vec<BatchTaskRow>> {
        let conn = self.conn()?;
        BatchRepo::read(&conn, batch_id)
    }

    // ─── Tool registry ───────────────────────────────────────────────────────

    /// Register or re-register a tool.
    pub fn upsert_tool(&self, descriptor: &ToolDescriptor) -> Result<()> {
        info!(tool = %descriptor.name, target = %descriptor.target, "registering tool");
        let conn = self.conn()?;
        ToolRepo::upsert(&conn, descriptor)
    }

    /// Look up one tool by name.
    pub fn get_tool(&self, name: &str) -> Result<Option<ToolDescriptor>> {
        let conn = self.conn()?;
        ToolRepo::get(&conn, name)
    }

    /// List all registered tools.
    pub fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let conn = self.conn()?;
        ToolRepo::list(&conn)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
