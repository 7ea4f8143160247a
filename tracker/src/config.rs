//! Tracker configuration loading
//!
//! Loads configuration from `~/.config/usecase-tracker/tracker.toml` (or the
//! `USECASE_TRACKER_CONFIG` env var). Every field has a default, so a missing
//! file is not an error.

use crate::errors::{Result, TrackerError};
use crate::identity::demo_users;
use crate::model::{Role, User};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Path to the SQLite database
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Insert the sample records when the store is empty
    #[serde(default)]
    pub seed_demo_data: bool,

    /// SQLite connection settings
    #[serde(default)]
    pub sqlite: SqliteConfig,

    /// Identity directory; the demo users when omitted
    #[serde(default = "default_users")]
    pub users: Vec<UserEntry>,
}

fn default_db_path() -> String {
    dirs::data_dir()
        .map(|d| {
            d.join("usecase-tracker")
                .join("change_tracker.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "change_tracker.db".to_string())
}

fn default_users() -> Vec<UserEntry> {
    demo_users().into_iter().map(UserEntry::from).collect()
}

/// SQLite connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Use WAL journaling (ignored for in-memory stores)
    #[serde(default = "default_wal")]
    pub wal: bool,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_wal() -> bool {
    true
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_wal(),
        }
    }
}

/// `[[users]]` entry
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

impl From<User> for UserEntry {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            display_name: u.display_name,
            email: u.email,
            role: u.role,
        }
    }
}

impl From<UserEntry> for User {
    fn from(e: UserEntry) -> Self {
        User::new(e.id, e.display_name, e.email, e.role)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            seed_demo_data: false,
            sqlite: SqliteConfig::default(),
            users: default_users(),
        }
    }
}

impl TrackerConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "USECASE_TRACKER_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "tracker.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `USECASE_TRACKER_CONFIG` environment variable
    /// 2. `~/.config/usecase-tracker/tracker.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "Tracker config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: TrackerConfig = toml::from_str(contents)
            .map_err(|e| TrackerError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("usecase-tracker")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(TrackerError::config("db_path must not be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for user in &self.users {
            if user.id.trim().is_empty() {
                return Err(TrackerError::config("user id must not be empty"));
            }
            if !seen.insert(user.id.as_str()) {
                return Err(TrackerError::config(format!(
                    "duplicate user id in directory: {}",
                    user.id
                )));
            }
        }

        if !self.users.iter().any(|u| u.role == Role::Admin) {
            tracing::warn!("No admin in the user directory; overrides can never be recorded");
        }

        Ok(())
    }

    /// Get the resolved database path (expanding ~ if needed)
    pub fn resolved_db_path(&self) -> PathBuf {
        let path = &self.db_path;
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }
}
