//! Override ledger
//!
//! Append-only. The ledger records whatever change list it is handed; the
//! decision to log belongs to `RecordService`.

use super::{TrackerDb, new_id, timestamp_column};
use crate::clock::{Timestamp, format_timestamp, sort_key};
use crate::diff::FieldChange;
use crate::errors::{Result, TrackerError};
use crate::model::{OverrideEvent, User};
use rusqlite::{Connection, params};

/// Override row with values still encoded
struct OverrideRow {
    id: String,
    record_id: String,
    version_id: String,
    field_path: String,
    original_value: Option<String>,
    new_value: Option<String>,
    overridden_by: String,
    overridden_by_name: String,
    overridden_at: Timestamp,
}

impl OverrideRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            record_id: row.get(1)?,
            version_id: row.get(2)?,
            field_path: row.get(3)?,
            original_value: row.get(4)?,
            new_value: row.get(5)?,
            overridden_by: row.get(6)?,
            overridden_by_name: row.get(7)?,
            overridden_at: timestamp_column(row, 8)?,
        })
    }

    fn decode(self) -> Result<OverrideEvent> {
        Ok(OverrideEvent {
            original_value: decode_value(&self.id, self.original_value.as_deref())?,
            new_value: decode_value(&self.id, self.new_value.as_deref())?,
            id: self.id,
            record_id: self.record_id,
            version_id: self.version_id,
            field_path: self.field_path,
            overridden_by: self.overridden_by,
            overridden_by_name: self.overridden_by_name,
            overridden_at: self.overridden_at,
        })
    }
}

/// NULL or empty text decodes to `None`.
fn decode_value(event_id: &str, raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    match raw {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text).map(Some).map_err(|e| {
            TrackerError::serialization_with_source(
                format!("failed to decode override value of event {event_id}"),
                e,
            )
        }),
    }
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags)
        .map_err(|e| TrackerError::serialization_with_source("failed to encode override value", e))
}

/// Write one event per change, all stamped `now`. Must run inside a
/// transaction.
pub(crate) fn insert_overrides(
    conn: &Connection,
    now: &Timestamp,
    record_id: &str,
    version_id: &str,
    overrides: &[FieldChange],
    actor: &User,
) -> Result<Vec<OverrideEvent>> {
    let mut events = Vec::with_capacity(overrides.len());
    for change in overrides {
        let event = OverrideEvent {
            id: new_id(),
            record_id: record_id.to_string(),
            version_id: version_id.to_string(),
            field_path: change.field_path().to_string(),
            original_value: Some(serde_json::Value::from(change.old_value.clone())),
            new_value: Some(serde_json::Value::from(change.new_value.clone())),
            overridden_by: actor.id.clone(),
            overridden_by_name: actor.display_name.clone(),
            overridden_at: *now,
        };

        conn.execute(
            r#"
            INSERT INTO override_events (
                id, record_id, version_id,
                field_path, original_value, new_value,
                overridden_by, overridden_by_name, overridden_at, overridden_at_us
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                event.id,
                event.record_id,
                event.version_id,
                event.field_path,
                encode_tags(&change.old_value)?,
                encode_tags(&change.new_value)?,
                event.overridden_by,
                event.overridden_by_name,
                format_timestamp(now),
                sort_key(now),
            ],
        )
        .map_err(|e| TrackerError::storage_with_source("failed to insert override event", e))?;

        events.push(event);
    }
    Ok(events)
}

impl TrackerDb {
    /// Persist one override event per change in a single transaction
    ///
    /// An empty change list writes nothing.
    pub fn log_overrides(
        &mut self,
        record_id: &str,
        version_id: &str,
        overrides: &[FieldChange],
        actor: &User,
    ) -> Result<Vec<OverrideEvent>> {
        if overrides.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.now();
        let events =
            self.write(|tx| insert_overrides(tx, &now, record_id, version_id, overrides, actor))?;

        tracing::debug!(
            record_id,
            version_id,
            override_count = events.len(),
            "Logged override events"
        );
        Ok(events)
    }

    /// Audit trail for a record, oldest first
    pub fn list_overrides_for_record(&self, record_id: &str) -> Result<Vec<OverrideEvent>> {
        let mut stmt = self
            .conn()
            .prepare(
                r#"
                SELECT id, record_id, version_id, field_path, original_value, new_value,
                       overridden_by, overridden_by_name, overridden_at
                FROM override_events
                WHERE record_id = ?1
                ORDER BY overridden_at_us ASC, rowid ASC
                "#,
            )
            .map_err(|e| TrackerError::storage_with_source("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![record_id], OverrideRow::from_row)
            .map_err(|e| TrackerError::storage_with_source("failed to query overrides", e))?;

        let mut events = Vec::new();
        for row in rows {
            let row = row
                .map_err(|e| TrackerError::storage_with_source("failed to read override row", e))?;
            events.push(row.decode()?);
        }
        Ok(events)
    }
}
