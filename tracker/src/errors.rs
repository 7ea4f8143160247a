//! Tracker error types
//!
//! Every failure is scoped to the single requested operation. Storage failures
//! are surfaced with context and never retried; a failed transaction leaves
//! the store exactly as it was.

use thiserror::Error;

/// Error category for structured logging and caller-side presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// `tracker.toml` or env misconfigured
    ConfigError,
    /// Referenced record, version or comment does not exist
    NotFound,
    /// Blank title or comment text reached the service
    ValidationError,
    /// Role policy does not permit the requested write
    PermissionDenied,
    /// Errors opening, migrating or querying the SQLite store
    StorageError,
    /// Stored JSON that could not be encoded/decoded
    SerializationError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::StorageError => "STORAGE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller can fix the failure by changing its input
    pub fn caller_correctable(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::ValidationError | Self::PermissionDenied
        )
    }
}

/// Tracker error with category and context
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TrackerError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::ConfigError,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::ValidationError,
            Self::PermissionDenied { .. } => ErrorCategory::PermissionDenied,
            Self::Storage { .. } => ErrorCategory::StorageError,
            Self::Serialization { .. } => ErrorCategory::SerializationError,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "record",
            id: id.into(),
        }
    }

    pub fn version_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "version",
            id: id.into(),
        }
    }

    pub fn comment_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "comment",
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a permission error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with source
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a serialization error with source
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Bare SQLite errors raised inside transaction closures.
impl From<rusqlite::Error> for TrackerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::storage_with_source("sqlite operation failed", e)
    }
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
