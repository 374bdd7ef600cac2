//! Orchestration repository — save/load of in-flight request records.
//!
//! Saves are whole-record upserts: the orchestrator always persists the
//! full record before returning from a step, and the record it wrote is
//! the only state the next activation has.

use rusqlite::{Connection, OptionalExtension, Row, params};

use expediter_core::{BatchId, OrchestrationId, Turn};

use crate::errors::{Result, StoreError};
use crate::types::{OrchestrationRecord, OrchestrationStatus};

/// Orchestration repository — stateless, every method takes `&Connection`.
pub struct OrchestrationRepo;

impl OrchestrationRepo {
    /// Upsert the full record.
    pub fn save(conn: &Connection, record: &OrchestrationRecord) -> Result<()> {
        let conversation = serde_json::to_string(&record.conversation)?;
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO orchestrations (id, instance, status, conversation, outstanding_batch_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               status = excluded.status,
               conversation = excluded.conversation,
               outstanding_batch_id = excluded.outstanding_batch_id,
               updated_at = excluded.updated_at",
            params![
                record.id.as_str(),
                record.instance,
                record.status.as_str(),
                conversation,
                record.outstanding_batch.as_ref().map(BatchId::as_str),
                now,
            ],
        )?;
        Ok(())
    }

    /// Conditionally persist a folded record: the write applies only if
    /// `batch_id` is still the record's outstanding batch, and clears it.
    ///
    /// This is the fold's claim. Concurrent activations that each saw the
    /// batch reach fully-done race here, and `SQLite` write serialization
    /// lets exactly one of them match the outstanding batch id — only
    /// that caller gets `true` and proceeds to re-plan.
    pub fn claim_fold(
        conn: &Connection,
        record: &OrchestrationRecord,
        batch_id: &BatchId,
    ) -> Result<bool> {
        let conversation = serde_json::to_string(&record.conversation)?;
        let now = chrono::Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE orchestrations
             SET status = ?1, conversation = ?2, outstanding_batch_id = NULL, updated_at = ?3
             WHERE id = ?4 AND outstanding_batch_id = ?5",
            params![
                record.status.as_str(),
                conversation,
                now,
                record.id.as_str(),
                batch_id.as_str(),
            ],
        )?;
        Ok(updated == 1)
    }

    /// Load a record by orchestration id.
    pub fn get_by_id(conn: &Connection, id: &OrchestrationId) -> Result<Option<OrchestrationRecord>> {
        conn.query_row(
            "SELECT id, instance, status, conversation, outstanding_batch_id
             FROM orchestrations WHERE id = ?1",
            params![id.as_str()],
            Self::map_row,
        )
        .optional()?
        .transpose()
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Result<OrchestrationRecord>> {
        let id: String = row.get(0)?;
        let instance: i64 = row.get(1)?;
        let status: String = row.get(2)?;
        let conversation: String = row.get(3)?;
        let outstanding: Option<String> = row.get(4)?;
        Ok(Self::assemble(id, instance, &status, &conversation, outstanding))
    }

    fn assemble(
        id: String,
        instance: i64,
        status: &str,
        conversation: &str,
        outstanding: Option<String>,
    ) -> Result<OrchestrationRecord> {
        let status = OrchestrationStatus::parse(status).ok_or_else(|| StoreError::CorruptRow {
            table: "orchestrations".into(),
            message: format!("unknown status {status:?}"),
        })?;
        let conversation: Vec<Turn> = serde_json::from_str(conversation)?;
        Ok(OrchestrationRecord {
            id: OrchestrationId::from_string(id),
            instance,
            status,
            conversation,
            outstanding_batch: outstanding.map(BatchId::from_string),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
