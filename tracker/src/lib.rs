//! Change tracking for AI use-case records
//!
//! Records are edited through a linear, append-only version history. Each
//! record keeps a pointer to its current version; admins who change tracked
//! metadata (`framework_tags`, `capability_groups`) produce `override`
//! versions with one audit event per changed field.
//!
//! Layout:
//! - `roles`: role predicates and the read-visibility rule
//! - `diff`: tracked-metadata diff and version comparison
//! - `db`: SQLite version store, comment store and override ledger
//! - `service`: `RecordService`, the orchestration and business rules
//!
//! Presentation (forms, navigation, user picking) lives outside this crate
//! and calls `RecordService` with an explicit acting `User`.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod clock;
pub mod config;
pub mod db;
pub mod diff;
pub mod errors;
pub mod identity;
pub mod model;
pub mod roles;
pub mod service;

pub use clock::{Clock, ManualClock, Timestamp, TorontoClock};
pub use config::TrackerConfig;
pub use db::TrackerDb;
pub use diff::{ContentChange, FieldChange, FieldValue, TrackedField, diff_ai_metadata};
pub use errors::{ErrorCategory, Result, TrackerError};
pub use identity::{IdentitySource, StaticDirectory};
pub use model::{
    AiMetadata, Comment, OverrideEvent, Record, RecordStatus, RecordVersion, Role,
    UseCaseContent, User, VersionType,
};
pub use service::{NewRecord, RecordService, Revision, RevisionOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
