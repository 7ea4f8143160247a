//! Entities of the tracker: users, records, versions, comments, overrides.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record type written by the demo seeder and the default form.
pub const AI_USE_CASE: &str = "ai_use_case";

/// Role of the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    /// Read-only access to non-draft records
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Viewer => "viewer",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity supplied by an external source. The tracker never mutates users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
            role,
        }
    }
}

/// Visibility status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    Submitted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

/// History semantics of a version, independent of record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    /// Always the type of version 1
    Draft,
    Edit,
    Submit,
    /// Admin revision that changed tracked metadata
    Override,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Edit => "edit",
            Self::Submit => "submit",
            Self::Override => "override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "edit" => Some(Self::Edit),
            "submit" => Some(Self::Submit),
            "override" => Some(Self::Override),
            _ => None,
        }
    }
}

/// Tracked classification lists of a use case.
///
/// Keys this version of the tracker does not know about are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMetadata {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub framework_tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub capability_groups: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AiMetadata {
    pub fn new(framework_tags: &[&str], capability_groups: &[&str]) -> Self {
        Self {
            framework_tags: framework_tags.iter().map(ToString::to_string).collect(),
            capability_groups: capability_groups.iter().map(ToString::to_string).collect(),
            extra: BTreeMap::new(),
        }
    }
}

/// Snapshot document stored with every version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UseCaseContent {
    #[serde(default)]
    pub business_problem: String,
    #[serde(default)]
    pub description: String,
    /// `None` when the stored document has no `ai_metadata` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_metadata: Option<AiMetadata>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl UseCaseContent {
    pub fn new(
        business_problem: impl Into<String>,
        description: impl Into<String>,
        ai_metadata: AiMetadata,
    ) -> Self {
        Self {
            business_problem: business_problem.into(),
            description: description.into(),
            ai_metadata: Some(ai_metadata),
            extra: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tracked entity; title and status mirror the latest version's intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub record_type: String,
    pub current_version_id: Option<String>,
    pub created_by: String,
    pub created_at: Timestamp,
    pub status: RecordStatus,
}

/// Immutable snapshot of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordVersion {
    pub id: String,
    pub record_id: String,
    pub version_number: i64,
    pub content: UseCaseContent,
    pub created_by: String,
    /// Author name as of the write, never refreshed
    pub created_by_name: String,
    pub created_at: Timestamp,
    pub version_type: VersionType,
    pub parent_version_id: Option<String>,
}

/// Discussion entry on a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub record_id: String,
    pub version_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_role: Role,
    pub text: String,
    pub created_at: Timestamp,
}

/// Audit entry for one admin-changed tracked field.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideEvent {
    pub id: String,
    pub record_id: String,
    pub version_id: String,
    pub field_path: String,
    /// `None` when the stored value is missing
    pub original_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub overridden_by: String,
    pub overridden_by_name: String,
    pub overridden_at: Timestamp,
}
