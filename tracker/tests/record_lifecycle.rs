//! End-to-end tests for the record service
//!
//! These tests drive `RecordService` the way a presentation layer would:
//! - version history stays gapless and immutable across revisions
//! - only admin metadata changes become overrides with audit entries
//! - visibility differs per role
//! - comments follow author/admin rules

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::TimeZone;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use usecase_tracker::{
    AiMetadata, ManualClock, NewRecord, RecordService, RecordStatus, Revision, Role,
    TrackerDb, TrackerError, UseCaseContent, User, VersionType,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

fn service() -> RecordService {
    let start = chrono::Utc
        .with_ymd_and_hms(2025, 10, 1, 13, 0, 0)
        .single()
        .expect("valid start");
    let db = TrackerDb::connect_in_memory()
        .expect("should connect")
        .with_clock(Arc::new(ManualClock::new(start, chrono::Duration::seconds(5))));
    RecordService::new(db)
}

fn alice() -> User {
    User::new("user-x", "Alice", "alice@example.com", Role::User)
}

fn admin() -> User {
    User::new("admin-y", "Ops Admin", "admin@example.com", Role::Admin)
}

fn viewer() -> User {
    User::new("viewer-z", "Reader", "viewer@example.com", Role::Viewer)
}

fn use_case(framework: &[&str], capabilities: &[&str]) -> UseCaseContent {
    UseCaseContent::new(
        "Automate policy brief summaries",
        "Summarize long policy documents",
        AiMetadata::new(framework, capabilities),
    )
}

fn revision(title: &str, content: UseCaseContent) -> Revision {
    Revision {
        title: title.to_string(),
        content,
        status: None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Version history
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn history_is_gapless_and_prior_versions_unchanged() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Summaries", use_case(&["KM"], &["NLP"]), RecordStatus::Draft),
        )
        .expect("create");

    let before = svc.history(&owner, &record.id).expect("history");
    for tag in ["KM2", "KM3", "KM4"] {
        svc.revise_record(&owner, &record.id, revision("Summaries", use_case(&[tag], &["NLP"])))
            .expect("revise");
    }

    let after = svc.history(&owner, &record.id).expect("history");
    let numbers: Vec<i64> = after.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[0].version_type, VersionType::Draft);
    assert!(after[1..].iter().all(|v| v.version_type == VersionType::Edit));
}

#[test]
fn revision_moves_pointer_title_and_status() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Draft title", use_case(&[], &[]), RecordStatus::Draft),
        )
        .expect("create");

    let outcome = svc
        .revise_record(
            &owner,
            &record.id,
            Revision {
                title: "Final title".to_string(),
                content: use_case(&[], &[]),
                status: Some(RecordStatus::Submitted),
            },
        )
        .expect("revise");

    let current = svc
        .current_version(&owner, &record.id)
        .expect("current")
        .expect("exists");
    assert_eq!(current, outcome.version);
    assert_eq!(outcome.version.parent_version_id, record.current_version_id);

    let stored = svc.get_record(&owner, &record.id).expect("get");
    assert_eq!(stored.title, "Final title");
    assert_eq!(stored.status, RecordStatus::Submitted);

    svc.revise_record(&owner, &record.id, revision("Final title", use_case(&[], &[])))
        .expect("revise again");
    let stored = svc.get_record(&owner, &record.id).expect("get");
    assert_eq!(stored.status, RecordStatus::Submitted, "omitted status is kept");
}

#[test]
fn revising_missing_record_is_not_found() {
    let mut svc = service();
    let err = svc
        .revise_record(&admin(), "no-such-record", revision("t", use_case(&[], &[])))
        .expect_err("missing");
    assert!(matches!(err, TrackerError::NotFound { .. }));
}

#[test]
fn interleaved_writers_keep_both_versions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shared.db");
    let open = |start_hour: u32| {
        let start = chrono::Utc
            .with_ymd_and_hms(2025, 10, 1, start_hour, 0, 0)
            .single()
            .expect("valid start");
        let db = TrackerDb::connect_and_init_at_path(&path)
            .expect("open")
            .with_clock(Arc::new(ManualClock::new(start, chrono::Duration::seconds(5))));
        RecordService::new(db)
    };
    let mut first = open(13);
    let mut second = open(14);

    let owner = alice();
    let record = first
        .create_record(
            &owner,
            NewRecord::use_case("Shared", use_case(&["A"], &[]), RecordStatus::Draft),
        )
        .expect("create");
    let v1 = record.current_version_id.clone().expect("pointer");

    let from_first = first
        .revise_record(&owner, &record.id, revision("From first", use_case(&["B"], &[])))
        .expect("first writer");
    let from_second = second
        .revise_record(&admin(), &record.id, revision("From second", use_case(&["B"], &[])))
        .expect("second writer");

    let history = first.history(&owner, &record.id).expect("history");
    let numbers: Vec<i64> = history.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(from_first.version.parent_version_id, Some(v1));
    assert_eq!(
        from_second.version.parent_version_id,
        Some(from_first.version.id.clone())
    );

    let stored = first.get_record(&owner, &record.id).expect("get");
    assert_eq!(stored.current_version_id, Some(from_second.version.id));
    assert_eq!(stored.title, "From second");
}

// ─────────────────────────────────────────────────────────────────────────────
// Override gating
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn admin_metadata_change_is_an_override() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&["Risk"], &["NLP"]), RecordStatus::Submitted),
        )
        .expect("create");

    let outcome = svc
        .revise_record(&admin(), &record.id, revision("Claims", use_case(&["Risk"], &["OCR"])))
        .expect("override");

    assert!(outcome.is_override());
    assert_eq!(outcome.version.version_type, VersionType::Override);
    assert_eq!(outcome.overrides.len(), 1);

    let ledger = svc.overrides_for_record(&admin(), &record.id).expect("ledger");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].field_path, "ai_metadata.capability_groups");
    assert_eq!(ledger[0].original_value, Some(serde_json::json!(["NLP"])));
    assert_eq!(ledger[0].new_value, Some(serde_json::json!(["OCR"])));
    assert_eq!(ledger[0].version_id, outcome.version.id);
    assert_eq!(ledger[0].overridden_by_name, "Ops Admin");
}

#[test]
fn user_metadata_change_is_a_plain_edit() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&["Risk"], &["NLP"]), RecordStatus::Submitted),
        )
        .expect("create");

    let outcome = svc
        .revise_record(&owner, &record.id, revision("Claims", use_case(&["Risk"], &["OCR"])))
        .expect("edit");

    assert_eq!(outcome.version.version_type, VersionType::Edit);
    assert!(outcome.overrides.is_empty());
    assert!(
        svc.overrides_for_record(&admin(), &record.id)
            .expect("ledger")
            .is_empty()
    );
}

#[test]
fn admin_narrative_only_change_is_an_edit() {
    let mut svc = service();
    let record = svc
        .create_record(
            &admin(),
            NewRecord::use_case("Claims", use_case(&["Risk"], &["NLP"]), RecordStatus::Draft),
        )
        .expect("create");

    let mut content = use_case(&["Risk"], &["NLP"]);
    content.description = "Now with a human in the loop".to_string();
    let outcome = svc
        .revise_record(&admin(), &record.id, revision("Claims", content))
        .expect("edit");

    assert_eq!(outcome.version.version_type, VersionType::Edit);
    assert!(outcome.overrides.is_empty());
}

#[test]
fn admin_reordering_tags_is_logged() {
    let mut svc = service();
    let record = svc
        .create_record(
            &alice(),
            NewRecord::use_case("Claims", use_case(&["A", "B"], &[]), RecordStatus::Draft),
        )
        .expect("create");

    let outcome = svc
        .revise_record(&admin(), &record.id, revision("Claims", use_case(&["B", "A"], &[])))
        .expect("override");
    assert_eq!(outcome.overrides.len(), 1);
    assert_eq!(outcome.overrides[0].field_path, "ai_metadata.framework_tags");
}

#[test]
fn version_comparison_covers_narrative_and_tags() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&["Risk"], &["NLP"]), RecordStatus::Draft),
        )
        .expect("create");
    let mut content = use_case(&["Risk", "Privacy"], &["NLP"]);
    content.business_problem = "Reduce manual review".to_string();
    let v2 = svc
        .revise_record(&owner, &record.id, revision("Claims", content))
        .expect("revise")
        .version;

    let v1 = record.current_version_id.expect("pointer");
    let changes = svc
        .compare_versions(&owner, &record.id, &v1, &v2.id)
        .expect("compare");
    let paths: Vec<&str> = changes.iter().map(|c| c.field_path).collect();
    assert_eq!(paths, vec!["business_problem", "ai_metadata.framework_tags"]);

    let err = svc
        .compare_versions(&owner, &record.id, &v1, "missing")
        .expect_err("unknown version");
    assert!(matches!(err, TrackerError::NotFound { entity: "version", .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn visibility_per_role() {
    let mut svc = service();
    let x = alice();
    let y = admin();

    let draft_x = svc
        .create_record(&x, NewRecord::use_case("X draft", use_case(&[], &[]), RecordStatus::Draft))
        .expect("create");
    let submitted_x = svc
        .create_record(
            &x,
            NewRecord::use_case("X submitted", use_case(&[], &[]), RecordStatus::Submitted),
        )
        .expect("create");
    let submitted_y = svc
        .create_record(
            &y,
            NewRecord::use_case("Y submitted", use_case(&[], &[]), RecordStatus::Submitted),
        )
        .expect("create");

    let titles = |user: &User| -> Vec<String> {
        svc.list_records(user)
            .expect("list")
            .into_iter()
            .map(|r| r.title)
            .collect()
    };

    assert_eq!(titles(&viewer()), vec!["Y submitted", "X submitted"]);
    assert_eq!(titles(&x), vec!["X submitted", "X draft"]);
    assert_eq!(titles(&y), vec!["Y submitted", "X submitted", "X draft"]);

    assert!(matches!(
        svc.get_record(&viewer(), &draft_x.id),
        Err(TrackerError::NotFound { .. })
    ));
    assert!(svc.get_record(&x, &submitted_y.id).is_err());
    assert!(svc.get_record(&viewer(), &submitted_x.id).is_ok());
}

#[test]
fn foreign_records_cannot_be_revised() {
    let mut svc = service();
    let record = svc
        .create_record(
            &admin(),
            NewRecord::use_case("Admin's", use_case(&[], &[]), RecordStatus::Draft),
        )
        .expect("create");

    let err = svc
        .revise_record(&alice(), &record.id, revision("Hijack", use_case(&[], &[])))
        .expect_err("hidden from users");
    assert!(matches!(err, TrackerError::NotFound { entity: "record", .. }));

    let err = svc
        .revise_record(&viewer(), &record.id, revision("Hijack", use_case(&[], &[])))
        .expect_err("viewers are read-only");
    assert!(matches!(err, TrackerError::PermissionDenied { .. }));

    assert_eq!(svc.history(&admin(), &record.id).expect("history").len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn comment_lifecycle() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&[], &[]), RecordStatus::Draft),
        )
        .expect("create");

    let comment = svc
        .add_comment(&owner, &record.id, "  Needs a risk review  ")
        .expect("add");
    assert_eq!(comment.text, "Needs a risk review");
    assert_eq!(comment.version_id, record.current_version_id);
    assert_eq!(comment.author_role, Role::User);

    let edited = svc
        .edit_comment(&owner, &comment.id, "Risk review done")
        .expect("edit");
    assert_eq!(edited.id, comment.id);
    assert_eq!(edited.record_id, record.id);
    assert_eq!(edited.text, "Risk review done");
    assert!(edited.created_at > comment.created_at);

    svc.delete_comment(&owner, &comment.id).expect("delete");
    assert!(
        svc.comments_for_record(&owner, &record.id)
            .expect("list")
            .is_empty()
    );
}

#[test]
fn only_author_or_admin_manage_comments() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&[], &[]), RecordStatus::Submitted),
        )
        .expect("create");
    let mine = svc.add_comment(&owner, &record.id, "mine").expect("add");
    let review = svc
        .add_comment(&admin(), &record.id, "Please add a data owner")
        .expect("add");

    assert!(matches!(
        svc.edit_comment(&owner, &review.id, "not yours"),
        Err(TrackerError::PermissionDenied { .. })
    ));
    assert!(matches!(
        svc.delete_comment(&viewer(), &mine.id),
        Err(TrackerError::PermissionDenied { .. })
    ));

    svc.edit_comment(&admin(), &mine.id, "moderated")
        .expect("admin edit");
    svc.delete_comment(&admin(), &mine.id)
        .expect("admin delete");
}

#[test]
fn comments_on_hidden_records_are_not_found() {
    let mut svc = service();
    let owner = alice();
    let other = User::new("user-w", "Walt", "walt@example.com", Role::User);
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&[], &[]), RecordStatus::Draft),
        )
        .expect("create");
    let comment = svc.add_comment(&owner, &record.id, "mine").expect("add");

    assert!(matches!(
        svc.add_comment(&other, &record.id, "hello"),
        Err(TrackerError::NotFound { entity: "record", .. })
    ));
    assert!(matches!(
        svc.edit_comment(&other, &comment.id, "not yours"),
        Err(TrackerError::NotFound { entity: "comment", .. })
    ));
    assert!(matches!(
        svc.delete_comment(&other, &comment.id),
        Err(TrackerError::NotFound { entity: "comment", .. })
    ));
    assert_eq!(
        svc.comments_for_record(&owner, &record.id).expect("list").len(),
        1
    );
}

#[test]
fn blank_and_viewer_comments_rejected() {
    let mut svc = service();
    let owner = alice();
    let record = svc
        .create_record(
            &owner,
            NewRecord::use_case("Claims", use_case(&[], &[]), RecordStatus::Submitted),
        )
        .expect("create");

    assert!(matches!(
        svc.add_comment(&owner, &record.id, "   "),
        Err(TrackerError::Validation { .. })
    ));
    assert!(matches!(
        svc.add_comment(&viewer(), &record.id, "can I?"),
        Err(TrackerError::PermissionDenied { .. })
    ));
    assert!(
        svc.comments_for_record(&viewer(), &record.id)
            .expect("viewer can read")
            .is_empty()
    );
}
