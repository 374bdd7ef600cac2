//! Batch repository — workflow tracking with atomic completion detection.
//!
//! A batch is the set of task invocations issued together from one
//! planning step. Each member task is one row with a pending flag; the
//! batch is complete when every flag is set.
//!
//! INVARIANT: `mark_done` performs the flag flip and the pending count in
//! one IMMEDIATE transaction. `SQLite` serializes writers, so of N
//! concurrent completions exactly one commits "flipped a row and zero
//! remain pending" — that caller, and only that caller, observes
//! [`MarkDoneOutcome::Completed`].

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;
use tracing::warn;

use expediter_core::{BatchId, InvocationId};

use crate::errors::{Result, StoreError};
use crate::types::{BatchTaskRow, MarkDoneOutcome};

/// One task to track, fixed at batch creation.
#[derive(Clone, Debug)]
pub struct BatchMember {
    /// Task (tool) name.
    pub task: String,
    /// The invocation dispatched for this task.
    pub invocation_id: InvocationId,
}

/// Batch repository — stateless, every method takes `&Connection`.
pub struct BatchRepo;

impl BatchRepo {
    /// Create a tracking batch with one pending row per member task.
    ///
    /// Rejects an empty member set: an empty batch could never report
    /// complete and would stall its orchestration invisibly.
    ///
    /// Duplicate task names collapse into one row (tracking is keyed by
    /// name); the first invocation id wins and a warning is logged.
    pub fn open(conn: &Connection, members: &[BatchMember]) -> Result<BatchId> {
        if members.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        let id = BatchId::new();
        let now = chrono::Utc::now().to_rfc3339();

        let tx = conn.unchecked_transaction()?;
        let _ = tx.execute(
            "INSERT INTO batches (id, created_at) VALUES (?1, ?2)",
            params![id.as_str(), now],
        )?;
        for member in members {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO batch_tasks (batch_id, task, invocation_id) VALUES (?1, ?2, ?3)",
                params![id.as_str(), member.task, member.invocation_id.as_str()],
            )?;
            if inserted == 0 {
                warn!(
                    batch_id = %id,
                    task = %member.task,
                    "duplicate task name in batch, tracking collapses to one flag"
                );
            }
        }
        tx.commit()?;
        Ok(id)
    }

    /// Atomically set a task's flag to done and store its payload.
    ///
    /// Returns [`MarkDoneOutcome::Completed`] only for the call whose
    /// update flipped the last pending flag. A task that is already done
    /// yields [`MarkDoneOutcome::Duplicate`] without touching the stored
    /// payload — the transport redelivers, and the first result wins.
    pub fn mark_done(
        conn: &mut Connection,
        batch_id: &BatchId,
        task: &str,
        payload: &Value,
    ) -> Result<MarkDoneOutcome> {
        let payload_json = serde_json::to_string(payload)?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE batch_tasks
             SET done = 1, payload = ?3, completed_at = ?4
             WHERE batch_id = ?1 AND task = ?2 AND done = 0",
            params![batch_id.as_str(), task, payload_json, now],
        )?;

        if updated == 0 {
            // Either the task is already done or it was never a member.
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT done FROM batch_tasks WHERE batch_id = ?1 AND task = ?2",
                    params![batch_id.as_str(), task],
                    |row| row.get(0),
                )
                .optional()?;
            tx.commit()?;
            return match existing {
                Some(_) => Ok(MarkDoneOutcome::Duplicate),
                None => {
                    let batch_exists: Option<i64> = conn
                        .query_row(
                            "SELECT 1 FROM batches WHERE id = ?1",
                            params![batch_id.as_str()],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if batch_exists.is_some() {
                        Err(StoreError::UnknownTask {
                            batch: batch_id.to_string(),
                            task: task.to_owned(),
                        })
                    } else {
                        Err(StoreError::BatchNotFound(batch_id.to_string()))
                    }
                }
            };
        }

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM batch_tasks WHERE batch_id = ?1 AND done = 0",
            params![batch_id.as_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        if remaining == 0 {
            Ok(MarkDoneOutcome::Completed)
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok(MarkDoneOutcome::StillPending {
                remaining: remaining as u32,
            })
        }
    }

    /// Read the full per-task result map of a batch.
    pub fn read(conn: &Connection, batch_id: &BatchId) -> Result<Vec<BatchTaskRow>> {
        let mut stmt = conn.prepare(
            "SELECT task, invocation_id, done, payload
             FROM batch_tasks WHERE batch_id = ?1 ORDER BY task",
        )?;
        let rows = stmt
            .query_map(params![batch_id.as_str()], |row| {
                let task: String = row.get(0)?;
                let invocation_id: String = row.get(1)?;
                let done: bool = row.get(2)?;
                let payload: Option<String> = row.get(3)?;
                Ok((task, invocation_id, done, payload))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Err(StoreError::BatchNotFound(batch_id.to_string()));
        }

        rows.into_iter()
            .map(|(task, invocation_id, done, payload)| {
                let payload = payload.map(|p| serde_json::from_str(&p)).transpose()?;
                Ok(BatchTaskRow {
                    task,
                    invocation_id: InvocationId::from_string(invocation_id),
                    done,
                    payload,
                })
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
