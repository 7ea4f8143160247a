//! Version store: records, their append-only history, and the current
//! version pointer.

use super::{TrackerDb, conversion_error, new_id, timestamp_column};
use crate::clock::{Timestamp, format_timestamp, sort_key};
use crate::errors::{Result, TrackerError};
use crate::model::{Record, RecordStatus, RecordVersion, UseCaseContent, User, VersionType};
use crate::roles::Visibility;
use rusqlite::{Connection, OptionalExtension, params};

const RECORD_COLUMNS: &str =
    "id, title, record_type, current_version_id, created_by, created_at, status";

const VERSION_COLUMNS: &str = "id, record_id, version_number, content, created_by, \
     created_by_name, created_at, version_type, parent_version_id";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let status: String = row.get(6)?;
    Ok(Record {
        id: row.get(0)?,
        title: row.get(1)?,
        record_type: row.get(2)?,
        current_version_id: row.get(3)?,
        created_by: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        status: RecordStatus::parse(&status)
            .ok_or_else(|| conversion_error(6, format!("unknown status: {status}")))?,
    })
}

/// Version row with `content` still encoded
struct VersionRow {
    id: String,
    record_id: String,
    version_number: i64,
    content: String,
    created_by: String,
    created_by_name: String,
    created_at: Timestamp,
    version_type: VersionType,
    parent_version_id: Option<String>,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let version_type: String = row.get(7)?;
        Ok(Self {
            id: row.get(0)?,
            record_id: row.get(1)?,
            version_number: row.get(2)?,
            content: row.get(3)?,
            created_by: row.get(4)?,
            created_by_name: row.get(5)?,
            created_at: timestamp_column(row, 6)?,
            version_type: VersionType::parse(&version_type).ok_or_else(|| {
                conversion_error(7, format!("unknown version type: {version_type}"))
            })?,
            parent_version_id: row.get(8)?,
        })
    }

    fn decode(self) -> Result<RecordVersion> {
        let content = UseCaseContent::from_json(&self.content).map_err(|e| {
            TrackerError::serialization_with_source(
                format!("failed to decode content of version {}", self.id),
                e,
            )
        })?;
        Ok(RecordVersion {
            id: self.id,
            record_id: self.record_id,
            version_number: self.version_number,
            content,
            created_by: self.created_by,
            created_by_name: self.created_by_name,
            created_at: self.created_at,
            version_type: self.version_type,
            parent_version_id: self.parent_version_id,
        })
    }
}

fn encode_content(content: &UseCaseContent) -> Result<String> {
    content
        .to_json()
        .map_err(|e| TrackerError::serialization_with_source("failed to encode content", e))
}

pub(crate) fn get_record(conn: &Connection, record_id: &str) -> Result<Option<Record>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
        params![record_id],
        record_from_row,
    )
    .optional()
    .map_err(|e| TrackerError::storage_with_source("failed to get record", e))
}

pub(crate) fn get_version(conn: &Connection, version_id: &str) -> Result<Option<RecordVersion>> {
    let row = conn
        .query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM record_versions WHERE id = ?1"),
            params![version_id],
            VersionRow::from_row,
        )
        .optional()
        .map_err(|e| TrackerError::storage_with_source("failed to get version", e))?;
    row.map(VersionRow::decode).transpose()
}

/// Resolve the record's pointer. `None` when the record is missing or the
/// pointer does not lead to a stored version.
pub(crate) fn get_current_version(
    conn: &Connection,
    record_id: &str,
) -> Result<Option<RecordVersion>> {
    let pointer: Option<Option<String>> = conn
        .query_row(
            "SELECT current_version_id FROM records WHERE id = ?1",
            params![record_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| TrackerError::storage_with_source("failed to read version pointer", e))?;

    match pointer.flatten() {
        Some(version_id) => get_version(conn, &version_id),
        None => Ok(None),
    }
}

/// Insert a version on top of the record's current pointer and move the
/// pointer to it. Must run inside a transaction.
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_new_version(
    conn: &Connection,
    now: &Timestamp,
    record_id: &str,
    new_title: &str,
    content: &UseCaseContent,
    author: &User,
    version_type: VersionType,
    new_status: Option<RecordStatus>,
) -> Result<RecordVersion> {
    let record =
        get_record(conn, record_id)?.ok_or_else(|| TrackerError::record_not_found(record_id))?;
    let parent_version_id = record.current_version_id;

    let max_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version_number), 0) FROM record_versions WHERE record_id = ?1",
            params![record_id],
            |row| row.get(0),
        )
        .map_err(|e| TrackerError::storage_with_source("failed to read max version number", e))?;
    let version_number = max_version + 1;

    let version_id = new_id();
    let created_at = format_timestamp(now);
    conn.execute(
        r#"
        INSERT INTO record_versions (
            id, record_id, version_number, content,
            created_by, created_by_name, created_at,
            version_type, parent_version_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            version_id,
            record_id,
            version_number,
            encode_content(content)?,
            author.id,
            author.display_name,
            created_at,
            version_type.as_str(),
            parent_version_id,
        ],
    )
    .map_err(|e| TrackerError::storage_with_source("failed to insert version", e))?;

    let status = new_status.unwrap_or(record.status);
    conn.execute(
        r#"
        UPDATE records
        SET current_version_id = ?1, status = ?2, title = ?3
        WHERE id = ?4
        "#,
        params![version_id, status.as_str(), new_title, record_id],
    )
    .map_err(|e| TrackerError::storage_with_source("failed to move version pointer", e))?;

    tracing::debug!(
        record_id,
        version_number,
        version_type = version_type.as_str(),
        "Created record version"
    );

    Ok(RecordVersion {
        id: version_id,
        record_id: record_id.to_string(),
        version_number,
        content: content.clone(),
        created_by: author.id.clone(),
        created_by_name: author.display_name.clone(),
        created_at: *now,
        version_type,
        parent_version_id,
    })
}

impl TrackerDb {
    /// Create a record and its version 1 atomically
    ///
    /// The initial version is always typed `draft`; `status` only controls
    /// who can see the record.
    pub fn create_record_with_initial_version(
        &mut self,
        title: &str,
        record_type: &str,
        content: &UseCaseContent,
        author: &User,
        status: RecordStatus,
    ) -> Result<Record> {
        let now = self.now();
        let record_id = new_id();
        let version_id = new_id();
        let created_at = format_timestamp(&now);
        let encoded = encode_content(content)?;

        self.write(|tx| {
            tx.execute(
                r#"
                INSERT INTO records
                    (id, title, record_type, current_version_id, created_by,
                     created_at, created_at_us, status)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    record_id,
                    title,
                    record_type,
                    version_id,
                    author.id,
                    created_at,
                    sort_key(&now),
                    status.as_str(),
                ],
            )
            .map_err(|e| TrackerError::storage_with_source("failed to insert record", e))?;

            tx.execute(
                r#"
                INSERT INTO record_versions (
                    id, record_id, version_number, content,
                    created_by, created_by_name, created_at,
                    version_type, parent_version_id
                )
                VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7, NULL)
                "#,
                params![
                    version_id,
                    record_id,
                    encoded,
                    author.id,
                    author.display_name,
                    created_at,
                    VersionType::Draft.as_str(),
                ],
            )
            .map_err(|e| TrackerError::storage_with_source("failed to insert initial version", e))?;

            Ok(())
        })?;

        tracing::debug!(record_id = %record_id, status = status.as_str(), "Created record");

        Ok(Record {
            id: record_id,
            title: title.to_string(),
            record_type: record_type.to_string(),
            current_version_id: Some(version_id),
            created_by: author.id.clone(),
            created_at: now,
            status,
        })
    }

    /// Append a version and move the record's pointer, title and status
    ///
    /// Fails with `NotFound` if the record does not exist. `new_status` of
    /// `None` keeps the record's current status. The version type is taken
    /// as given; no diffing happens here.
    pub fn create_new_version(
        &mut self,
        record_id: &str,
        new_title: &str,
        content: &UseCaseContent,
        author: &User,
        version_type: VersionType,
        new_status: Option<RecordStatus>,
    ) -> Result<RecordVersion> {
        let now = self.now();
        self.write(|tx| {
            insert_new_version(
                tx,
                &now,
                record_id,
                new_title,
                content,
                author,
                version_type,
                new_status,
            )
        })
    }

    pub fn get_record_by_id(&self, record_id: &str) -> Result<Option<Record>> {
        get_record(self.conn(), record_id)
    }

    pub fn get_version_by_id(&self, version_id: &str) -> Result<Option<RecordVersion>> {
        get_version(self.conn(), version_id)
    }

    pub fn get_current_version(&self, record_id: &str) -> Result<Option<RecordVersion>> {
        get_current_version(self.conn(), record_id)
    }

    /// Full timeline, ascending by version number
    pub fn list_versions_for_record(&self, record_id: &str) -> Result<Vec<RecordVersion>> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM record_versions
                 WHERE record_id = ?1
                 ORDER BY version_number ASC"
            ))
            .map_err(|e| TrackerError::storage_with_source("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![record_id], VersionRow::from_row)
            .map_err(|e| TrackerError::storage_with_source("failed to query versions", e))?;

        let mut versions = Vec::new();
        for row in rows {
            let row = row
                .map_err(|e| TrackerError::storage_with_source("failed to read version row", e))?;
            versions.push(row.decode()?);
        }
        Ok(versions)
    }

    /// Records visible to `user`, newest first
    pub fn list_records_for_role(&self, user: &User) -> Result<Vec<Record>> {
        let (filter, arg) = match Visibility::for_user(user) {
            Visibility::All => ("1 = 1", None),
            Visibility::CreatedBy(id) => ("created_by = ?1", Some(id)),
            Visibility::NonDraft => ("status != 'draft'", None),
        };

        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE {filter}
                 ORDER BY created_at_us DESC, rowid DESC"
            ))
            .map_err(|e| TrackerError::storage_with_source("failed to prepare query", e))?;

        let rows = match &arg {
            Some(id) => stmt.query_map(params![id], record_from_row),
            None => stmt.query_map([], record_from_row),
        }
        .map_err(|e| TrackerError::storage_with_source("failed to query records", e))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(
                row.map_err(|e| TrackerError::storage_with_source("failed to read record row", e))?,
            );
        }
        Ok(records)
    }
}
