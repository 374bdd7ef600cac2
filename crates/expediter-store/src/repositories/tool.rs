//! Tool registry repository.
//!
//! One row per registered task type, keyed by tool name. Registration is
//! an upsert: workers re-register on every deploy and the latest config
//! wins.

use rusqlite::{Connection, OptionalExtension, params};

use expediter_core::{DispatchKind, InputSchema, ToolDescriptor};

use crate::errors::{Result, StoreError};

/// Tool registry repository — stateless, every method takes `&Connection`.
pub struct ToolRepo;

impl ToolRepo {
    /// Insert or replace a tool's registry entry.
    pub fn upsert(conn: &Connection, descriptor: &ToolDescriptor) -> Result<()> {
        let schema_json = serde_json::to_string(&descriptor.schema)?;
        let kind = match descriptor.kind {
            DispatchKind::Queue => "queue",
        };
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO tools (name, description, schema, kind, target, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                 description = excluded.description,
                 schema = excluded.schema,
                 kind = excluded.kind,
                 target = excluded.target,
                 registered_at = excluded.registered_at",
            params![
                descriptor.name,
                descriptor.description,
                schema_json,
                kind,
                descriptor.target,
                now
            ],
        )?;
        Ok(())
    }

    /// Look up one tool by name.
    pub fn get(conn: &Connection, name: &str) -> Result<Option<ToolDescriptor>> {
        conn.query_row(
            "SELECT name, description, schema, kind, target FROM tools WHERE name = ?1",
            params![name],
            map_row,
        )
        .optional()?
        .map(assemble)
        .transpose()
    }

    /// List every registered tool, ordered by name.
    pub fn list(conn: &Connection) -> Result<Vec<ToolDescriptor>> {
        let mut stmt = conn.prepare(
            "SELECT name, description, schema, kind, target FROM tools ORDER BY name",
        )?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(assemble).collect()
    }
}

type ToolRow = (String, String, String, String, String);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ToolRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn assemble(row: ToolRow) -> Result<ToolDescriptor> {
    let (name, description, schema_json, kind, target) = row;
    let schema: InputSchema = serde_json::from_str(&schema_json)?;
    let kind = DispatchKind::parse(&kind).ok_or_else(|| StoreError::CorruptRow {
        table: "tools".to_owned(),
        message: format!("unknown dispatch kind {kind:?} for tool {name}"),
    })?;
    Ok(ToolDescriptor {
        name,
        description,
        schema,
        kind,
        target,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
