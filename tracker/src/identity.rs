//! Identity source
//!
//! Users come from outside the tracker. This module only defines the lookup
//! seam and a static directory built from configuration.

use crate::config::TrackerConfig;
use crate::model::{Role, User};

/// Owner id used for the seeded admin sample record.
pub const SEED_ADMIN_ID: &str = "admin-seed";

/// Supplies the users the presentation layer can act as.
pub trait IdentitySource {
    fn users(&self) -> Vec<User>;

    fn find(&self, user_id: &str) -> Option<User> {
        self.users().into_iter().find(|u| u.id == user_id)
    }

    /// Human-friendly name for a stored user id, falling back to the id.
    fn display_name_for(&self, user_id: &str) -> String {
        if let Some(user) = self.find(user_id) {
            return user.display_name;
        }
        if user_id == SEED_ADMIN_ID {
            return seed_admin().display_name;
        }
        user_id.to_string()
    }
}

/// Fixed list of users.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    users: Vec<User>,
}

impl StaticDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn from_config(cfg: &TrackerConfig) -> Self {
        Self::new(cfg.users.iter().cloned().map(User::from).collect())
    }
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new(demo_users())
    }
}

impl IdentitySource for StaticDirectory {
    fn users(&self) -> Vec<User> {
        self.users.clone()
    }
}

/// One user per role.
pub fn demo_users() -> Vec<User> {
    vec![
        User::new("user-1", "Akshat (User)", "akshat.user@example.com", Role::User),
        User::new("user-2", "OPS Admin", "admin@example.com", Role::Admin),
        User::new(
            "user-3",
            "OPS Viewer (Read-only)",
            "viewer@example.com",
            Role::Viewer,
        ),
    ]
}

/// Owner of the submitted sample record.
pub fn seed_admin() -> User {
    User::new(
        SEED_ADMIN_ID,
        "Seeded Admin Record Owner",
        "seeded-admin@example.com",
        Role::Admin,
    )
}
