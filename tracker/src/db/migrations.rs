//! Schema versioning and migrations
//!
//! Forward-only. The applied version is tracked in `PRAGMA user_version` and
//! every statement is idempotent, so opening an existing store is safe.

use super::transactions::execute_in_transaction;
use crate::errors::{Result, TrackerError};
use rusqlite::{Connection, TransactionBehavior};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    record_type TEXT NOT NULL,
    current_version_id TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('draft', 'submitted'))
);

CREATE TABLE IF NOT EXISTS record_versions (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES records(id),
    version_number INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_by_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    version_type TEXT NOT NULL
        CHECK (version_type IN ('draft', 'edit', 'submit', 'override')),
    parent_version_id TEXT,
    UNIQUE (record_id, version_number)
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES records(id),
    version_id TEXT,
    author_id TEXT NOT NULL,
    author_name TEXT NOT NULL,
    role TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS override_events (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES records(id),
    version_id TEXT NOT NULL REFERENCES record_versions(id),
    field_path TEXT NOT NULL,
    original_value TEXT,
    new_value TEXT,
    overridden_by TEXT NOT NULL,
    overridden_by_name TEXT NOT NULL,
    overridden_at TEXT NOT NULL,
    overridden_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_created ON records(created_at_us);
CREATE INDEX IF NOT EXISTS idx_records_created_by ON records(created_by);
CREATE INDEX IF NOT EXISTS idx_comments_record ON comments(record_id, created_at_us);
CREATE INDEX IF NOT EXISTS idx_overrides_record ON override_events(record_id, overridden_at_us);
"#;

/// Apply all migrations to bring DB to current version
pub fn migrate_to_latest(conn: &mut Connection) -> Result<()> {
    let current = get_schema_version(conn)?;

    if current > SCHEMA_VERSION {
        return Err(TrackerError::storage(format!(
            "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    if current < 1 {
        execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
            tx.execute_batch(MIGRATION_V1)
                .map_err(|e| TrackerError::storage_with_source("failed to apply migration v1", e))?;
            set_schema_version(tx, 1)
        })?;
        tracing::debug!(version = 1, "Applied tracker schema migration");
    }

    Ok(())
}

/// Get current schema version
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| TrackerError::storage_with_source("failed to read schema version", e))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)
        .map_err(|e| TrackerError::storage_with_source("failed to set schema version", e))
}
