//! Record service
//!
//! The only component with business rules. Every call takes the acting
//! `User` explicitly; there is no session state.
//!
//! The override rule: when an admin saves a version whose tracked metadata
//! differs from the current version, the version is typed `override` and one
//! audit event per changed field is written in the same transaction.
//! Everyone else produces `edit` versions and no audit entries.

use crate::config::TrackerConfig;
use crate::db::TrackerDb;
use crate::db::overrides::insert_overrides;
use crate::db::versions::{get_current_version, insert_new_version};
use crate::diff::{ContentChange, compare_versions, diff_ai_metadata};
use crate::errors::{Result, TrackerError};
use crate::identity::seed_admin;
use crate::model::{
    AI_USE_CASE, AiMetadata, Comment, OverrideEvent, Record, RecordStatus, RecordVersion,
    UseCaseContent, User, VersionType,
};
use crate::roles::{self, Visibility};

/// Input for a new record
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub title: String,
    pub record_type: String,
    pub content: UseCaseContent,
    pub status: RecordStatus,
}

impl NewRecord {
    /// An `ai_use_case` record
    pub fn use_case(
        title: impl Into<String>,
        content: UseCaseContent,
        status: RecordStatus,
    ) -> Self {
        Self {
            title: title.into(),
            record_type: AI_USE_CASE.to_string(),
            content,
            status,
        }
    }
}

/// Input for a revision of an existing record
#[derive(Debug, Clone)]
pub struct Revision {
    pub title: String,
    pub content: UseCaseContent,
    /// `None` keeps the record's status
    pub status: Option<RecordStatus>,
}

/// Outcome of a revision
#[derive(Debug, Clone)]
pub struct RevisionOutcome {
    pub version: RecordVersion,
    /// Empty unless the version is an override
    pub overrides: Vec<OverrideEvent>,
}

impl RevisionOutcome {
    pub fn is_override(&self) -> bool {
        self.version.version_type == VersionType::Override
    }
}

pub struct RecordService {
    db: TrackerDb,
}

impl RecordService {
    pub fn new(db: TrackerDb) -> Self {
        Self { db }
    }

    /// Open the configured store, seeding sample data when requested
    pub fn open(cfg: &TrackerConfig, seed_owner: Option<&User>) -> Result<Self> {
        let db = TrackerDb::connect_and_init(cfg)?;
        let mut service = Self::new(db);

        if cfg.seed_demo_data
            && let Some(owner) = seed_owner
        {
            service.seed_demo_data(owner)?;
        }

        tracing::info!(
            db_path = %cfg.resolved_db_path().display(),
            "Record service ready"
        );
        Ok(service)
    }

    pub fn db(&self) -> &TrackerDb {
        &self.db
    }

    /// Create a record; version 1 is always a `draft` version
    pub fn create_record(&mut self, actor: &User, new: NewRecord) -> Result<Record> {
        if !roles::can_edit_records(actor) {
            return Err(TrackerError::permission_denied(format!(
                "{} users cannot create records",
                actor.role
            )));
        }
        let title = required_text(&new.title, "title")?;

        let record = self.db.create_record_with_initial_version(
            &title,
            &new.record_type,
            &new.content,
            actor,
            new.status,
        )?;

        tracing::info!(
            record_id = %record.id,
            actor = %actor.id,
            status = record.status.as_str(),
            "Record created"
        );
        Ok(record)
    }

    /// Save a new version, applying the override rule
    pub fn revise_record(
        &mut self,
        actor: &User,
        record_id: &str,
        revision: Revision,
    ) -> Result<RevisionOutcome> {
        if !roles::can_edit_records(actor) {
            return Err(TrackerError::permission_denied(format!(
                "{} users cannot revise records",
                actor.role
            )));
        }
        self.get_record(actor, record_id)?;
        let title = required_text(&revision.title, "title")?;

        let now = self.db.now();
        let outcome = self.db.write(|tx| {
            let previous = get_current_version(tx, record_id)?;
            let previous_meta: Option<&AiMetadata> =
                previous.as_ref().and_then(|v| v.content.ai_metadata.as_ref());
            let changes = diff_ai_metadata(previous_meta, revision.content.ai_metadata.as_ref());

            let overriding = roles::is_admin(actor) && !changes.is_empty();
            let version_type = if overriding {
                VersionType::Override
            } else {
                VersionType::Edit
            };

            let version = insert_new_version(
                tx,
                &now,
                record_id,
                &title,
                &revision.content,
                actor,
                version_type,
                revision.status,
            )?;

            let overrides = if overriding {
                insert_overrides(tx, &now, record_id, &version.id, &changes, actor)?
            } else {
                Vec::new()
            };

            Ok(RevisionOutcome { version, overrides })
        })?;

        tracing::info!(
            record_id,
            actor = %actor.id,
            version_number = outcome.version.version_number,
            version_type = outcome.version.version_type.as_str(),
            override_count = outcome.overrides.len(),
            "Record revised"
        );
        Ok(outcome)
    }

    /// Records visible to `actor`, newest first
    pub fn list_records(&self, actor: &User) -> Result<Vec<Record>> {
        self.db.list_records_for_role(actor)
    }

    /// A single record; records outside the actor's visibility are reported
    /// as missing
    pub fn get_record(&self, actor: &User, record_id: &str) -> Result<Record> {
        self.db
            .get_record_by_id(record_id)?
            .filter(|r| Visibility::for_user(actor).permits(r))
            .ok_or_else(|| TrackerError::record_not_found(record_id))
    }

    pub fn current_version(&self, actor: &User, record_id: &str) -> Result<Option<RecordVersion>> {
        self.get_record(actor, record_id)?;
        self.db.get_current_version(record_id)
    }

    /// Full version timeline, ascending
    pub fn history(&self, actor: &User, record_id: &str) -> Result<Vec<RecordVersion>> {
        self.get_record(actor, record_id)?;
        self.db.list_versions_for_record(record_id)
    }

    /// Differences between two versions of the same record
    pub fn compare_versions(
        &self,
        actor: &User,
        record_id: &str,
        base_version_id: &str,
        compare_version_id: &str,
    ) -> Result<Vec<ContentChange>> {
        self.get_record(actor, record_id)?;
        let base = self.version_of(record_id, base_version_id)?;
        let compare = self.version_of(record_id, compare_version_id)?;
        Ok(compare_versions(&base, &compare))
    }

    fn version_of(&self, record_id: &str, version_id: &str) -> Result<RecordVersion> {
        self.db
            .get_version_by_id(version_id)?
            .filter(|v| v.record_id == record_id)
            .ok_or_else(|| TrackerError::version_not_found(version_id))
    }

    pub fn overrides_for_record(
        &self,
        actor: &User,
        record_id: &str,
    ) -> Result<Vec<OverrideEvent>> {
        self.get_record(actor, record_id)?;
        self.db.list_overrides_for_record(record_id)
    }

    pub fn comments_for_record(&self, actor: &User, record_id: &str) -> Result<Vec<Comment>> {
        self.get_record(actor, record_id)?;
        self.db.list_comments_for_record(record_id)
    }

    /// Comment on a record, pinned to its current version
    pub fn add_comment(&mut self, actor: &User, record_id: &str, text: &str) -> Result<Comment> {
        if !roles::can_comment(actor) {
            return Err(TrackerError::permission_denied(format!(
                "{} users cannot comment",
                actor.role
            )));
        }
        let text = required_text(text, "comment text")?;
        let current = self.current_version(actor, record_id)?;

        self.db
            .add_comment(record_id, current.as_ref().map(|v| v.id.as_str()), &text, actor)
    }

    /// Edit a comment; author or admin only
    pub fn edit_comment(&mut self, actor: &User, comment_id: &str, text: &str) -> Result<Comment> {
        let text = required_text(text, "comment text")?;
        self.manageable_comment(actor, comment_id)?;
        self.db.update_comment(comment_id, &text)?;
        self.db
            .get_comment_by_id(comment_id)?
            .ok_or_else(|| TrackerError::comment_not_found(comment_id))
    }

    /// Delete a comment; author or admin only
    pub fn delete_comment(&mut self, actor: &User, comment_id: &str) -> Result<()> {
        self.manageable_comment(actor, comment_id)?;
        self.db.delete_comment(comment_id)?;
        tracing::info!(comment_id, actor = %actor.id, "Comment deleted");
        Ok(())
    }

    /// Comments on records outside the actor's visibility are reported as
    /// missing, like the records themselves.
    fn manageable_comment(&self, actor: &User, comment_id: &str) -> Result<Comment> {
        if !roles::can_comment(actor) {
            return Err(TrackerError::permission_denied(format!(
                "{} users cannot modify comments",
                actor.role
            )));
        }
        let comment = self
            .db
            .get_comment_by_id(comment_id)?
            .ok_or_else(|| TrackerError::comment_not_found(comment_id))?;
        match self.get_record(actor, &comment.record_id) {
            Ok(_) => {}
            Err(TrackerError::NotFound { .. }) => {
                return Err(TrackerError::comment_not_found(comment_id));
            }
            Err(e) => return Err(e),
        }
        if !roles::can_manage_comment(actor, &comment) {
            return Err(TrackerError::permission_denied(format!(
                "user {} may not modify comment {comment_id}",
                actor.id
            )));
        }
        Ok(comment)
    }

    /// Insert the two sample records if the store is empty
    ///
    /// Returns whether anything was written.
    pub fn seed_demo_data(&mut self, owner: &User) -> Result<bool> {
        if self.db.count_records()? > 0 {
            return Ok(false);
        }

        self.db.create_record_with_initial_version(
            "Fraud Detection in Benefit Claims",
            AI_USE_CASE,
            &UseCaseContent::new(
                "Detect suspicious benefit claims using AI.",
                "Use classification models to flag high-risk claims for review.",
                AiMetadata::new(&["Risk & Governance"], &["Fraud Detection"]),
            ),
            owner,
            RecordStatus::Draft,
        )?;

        self.db.create_record_with_initial_version(
            "Policy Document Summarization",
            AI_USE_CASE,
            &UseCaseContent::new(
                "Automate document summarization for policy briefs.",
                "Use NLP to create short summaries for long policy documents.",
                AiMetadata::new(&["Knowledge Management"], &["NLP"]),
            ),
            &seed_admin(),
            RecordStatus::Submitted,
        )?;

        tracing::info!(owner = %owner.id, "Seeded demo records");
        Ok(true)
    }
}

/// Trimmed, non-empty text or a validation error
fn required_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
