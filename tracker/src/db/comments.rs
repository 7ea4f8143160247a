//! Comment store
//!
//! A plain persistence layer: it does not reject empty text and does not
//! check who is editing or deleting. Both checks belong to the caller
//! (`RecordService` applies them); anything else reusing these methods
//! directly must apply them too.

use super::{TrackerDb, conversion_error, new_id, timestamp_column};
use crate::clock::{format_timestamp, sort_key};
use crate::errors::{Result, TrackerError};
use crate::model::{Comment, Role, User};
use rusqlite::{OptionalExtension, params};

const COMMENT_COLUMNS: &str =
    "id, record_id, version_id, author_id, author_name, role, text, created_at";

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let role: String = row.get(5)?;
    Ok(Comment {
        id: row.get(0)?,
        record_id: row.get(1)?,
        version_id: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        author_role: Role::parse(&role)
            .ok_or_else(|| conversion_error(5, format!("unknown role: {role}")))?,
        text: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
    })
}

impl TrackerDb {
    /// Add a comment, optionally pinned to the version it was written against
    pub fn add_comment(
        &mut self,
        record_id: &str,
        version_id: Option<&str>,
        text: &str,
        author: &User,
    ) -> Result<Comment> {
        let now = self.now();
        let comment = Comment {
            id: new_id(),
            record_id: record_id.to_string(),
            version_id: version_id.map(ToString::to_string),
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            author_role: author.role,
            text: text.to_string(),
            created_at: now,
        };

        self.write(|tx| {
            tx.execute(
                r#"
                INSERT INTO comments (
                    id, record_id, version_id,
                    author_id, author_name, role, text, created_at, created_at_us
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    comment.id,
                    comment.record_id,
                    comment.version_id,
                    comment.author_id,
                    comment.author_name,
                    comment.author_role.as_str(),
                    comment.text,
                    format_timestamp(&now),
                    sort_key(&now),
                ],
            )
            .map_err(|e| TrackerError::storage_with_source("failed to insert comment", e))?;
            Ok(())
        })?;

        tracing::debug!(record_id, comment_id = %comment.id, "Added comment");
        Ok(comment)
    }

    pub fn get_comment_by_id(&self, comment_id: &str) -> Result<Option<Comment>> {
        self.conn()
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![comment_id],
                comment_from_row,
            )
            .optional()
            .map_err(|e| TrackerError::storage_with_source("failed to get comment", e))
    }

    /// Thread for a record, oldest first
    pub fn list_comments_for_record(&self, record_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE record_id = ?1
                 ORDER BY created_at_us ASC, rowid ASC"
            ))
            .map_err(|e| TrackerError::storage_with_source("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![record_id], comment_from_row)
            .map_err(|e| TrackerError::storage_with_source("failed to query comments", e))?;

        let mut comments = Vec::new();
        for row in rows {
            let comment = row
                .map_err(|e| TrackerError::storage_with_source("failed to read comment row", e))?;
            comments.push(comment);
        }
        Ok(comments)
    }

    /// Overwrite the text and move the timestamp to now
    pub fn update_comment(&mut self, comment_id: &str, new_text: &str) -> Result<()> {
        let now = self.now();
        let updated = self.write(|tx| {
            tx.execute(
                r#"
                UPDATE comments
                SET text = ?1, created_at = ?2, created_at_us = ?3
                WHERE id = ?4
                "#,
                params![new_text, format_timestamp(&now), sort_key(&now), comment_id],
            )
            .map_err(|e| TrackerError::storage_with_source("failed to update comment", e))
        })?;

        if updated == 0 {
            return Err(TrackerError::comment_not_found(comment_id));
        }
        tracing::debug!(comment_id, "Updated comment");
        Ok(())
    }

    /// Permanently delete a comment
    pub fn delete_comment(&mut self, comment_id: &str) -> Result<()> {
        let deleted = self.write(|tx| {
            tx.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])
                .map_err(|e| TrackerError::storage_with_source("failed to delete comment", e))
        })?;

        if deleted == 0 {
            return Err(TrackerError::comment_not_found(comment_id));
        }
        tracing::debug!(comment_id, "Deleted comment");
        Ok(())
    }
}
