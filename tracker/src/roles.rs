//! Role policy
//!
//! Pure predicates over a user's role. Both the record listing filter and the
//! per-action checks in the service derive from this module, so what a user
//! can see and what the presentation layer offers never drift apart.

use crate::model::{Comment, Record, RecordStatus, Role, User};

pub fn is_user(user: &User) -> bool {
    user.role == Role::User
}

pub fn is_admin(user: &User) -> bool {
    user.role == Role::Admin
}

pub fn is_viewer(user: &User) -> bool {
    user.role == Role::Viewer
}

/// Which records a user may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Every record
    All,
    /// Only records created by this user id
    CreatedBy(String),
    /// Only records whose status is not `draft`
    NonDraft,
}

impl Visibility {
    pub fn for_user(user: &User) -> Self {
        match user.role {
            Role::Admin => Self::All,
            Role::User => Self::CreatedBy(user.id.clone()),
            Role::Viewer => Self::NonDraft,
        }
    }

    pub fn permits(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::CreatedBy(id) => record.created_by == *id,
            Self::NonDraft => record.status != RecordStatus::Draft,
        }
    }
}

/// Viewers are read-only.
pub fn can_edit_records(user: &User) -> bool {
    !is_viewer(user)
}

pub fn can_comment(user: &User) -> bool {
    !is_viewer(user)
}

/// Only the author of a comment or an admin may edit or delete it.
pub fn can_manage_comment(user: &User, comment: &Comment) -> bool {
    is_admin(user) || comment.author_id == user.id
}
