//! SQLite persistence for the tracker
//!
//! One `TrackerDb` owns one connection and holds four relations:
//! - `records` with the mutable current-version pointer
//! - `record_versions`, append-only history
//! - `comments`, mutable discussion threads
//! - `override_events`, append-only audit ledger
//!
//! Reads take `&self`; every write takes `&mut self` and runs as a single
//! transaction.

pub mod comments;
pub mod migrations;
pub mod overrides;
pub mod transactions;
pub mod versions;

use crate::clock::{Clock, Timestamp, TorontoClock, parse_timestamp};
use crate::config::TrackerConfig;
use crate::errors::{Result, TrackerError};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use transactions::execute_in_transaction;

/// Tracker database wrapper
pub struct TrackerDb {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl TrackerDb {
    /// Connect to the configured database and migrate it
    ///
    /// Creates the database file if it doesn't exist.
    pub fn connect_and_init(cfg: &TrackerConfig) -> Result<Self> {
        let path = cfg.resolved_db_path();
        let db = Self::connect_and_init_at_path(&path)?;

        db.conn
            .busy_timeout(Duration::from_millis(cfg.sqlite.busy_timeout_ms))
            .map_err(|e| TrackerError::storage_with_source("failed to set busy timeout", e))?;
        if cfg.sqlite.wal {
            // journal_mode returns the resulting mode as a row
            db.conn
                .query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
                .map_err(|e| TrackerError::storage_with_source("failed to enable WAL", e))?;
        }

        Ok(db)
    }

    /// Connect to a specific database path
    pub fn connect_and_init_at_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::storage_with_source(
                    format!("failed to create db directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TrackerError::storage_with_source(format!("failed to open db at {}", path.display()), e)
        })?;

        let db = Self::init(conn)?;
        tracing::debug!(path = %path.display(), "Tracker DB initialized");
        Ok(db)
    }

    /// Connect to an in-memory database
    pub fn connect_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrackerError::storage_with_source("failed to open in-memory db", e))?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| TrackerError::storage_with_source("failed to enable foreign keys", e))?;
        migrations::migrate_to_latest(&mut conn)?;
        Ok(Self {
            conn,
            clock: Arc::new(TorontoClock),
        })
    }

    /// Replace the clock used to stamp writes
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `operation` in one immediate transaction
    pub(crate) fn write<F, T>(&mut self, operation: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        execute_in_transaction(&mut self.conn, TransactionBehavior::Immediate, operation)
    }

    /// Get record count (for seeding and debugging)
    pub fn count_records(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(|e| TrackerError::storage_with_source("failed to count records", e))
    }
}

/// Column decode failure surfaced through rusqlite's row API.
pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

pub(crate) fn timestamp_column(
    row: &rusqlite::Row<'_>,
    column: usize,
) -> rusqlite::Result<Timestamp> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(column, format!("bad timestamp: {raw}")))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
