//! Error types for feedpager
//!
//! All modules use `FeedResult<T>` as their return type.

use crate::feed::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feedpager operations
pub type FeedResult<T> = Result<T, FeedError>;

/// All errors that can occur in feedpager
#[derive(Error, Debug)]
pub enum FeedError {
    // Store errors
    #[error("Ordered store query failed: {0}")]
    Store(String),

    #[error("Overlay store error: {0}")]
    OverlayStore(String),

    // Pagination errors
    #[error("Invalid cursor token: {0}")]
    InvalidCursor(String),

    #[error("Cursor from {found} phase passed to a {expected} phase query")]
    CursorPhaseMismatch { expected: Phase, found: Phase },

    #[error("Feed has no {0} phase")]
    PhaseUnavailable(Phase),

    #[error("Invalid page size: {0}. Page size must be at least 1")]
    InvalidPageSize(usize),

    #[error("Item not found in feed {query_id}: {key}")]
    ItemNotFound { query_id: String, key: String },

    #[error("Feed {0} has no overlay attached")]
    OverlayMissing(String),

    // Persistence errors
    #[error("Persistence error for key {key}: {reason}")]
    Persistence { key: String, reason: String },

    #[error("Invalid fixture {path}: {reason}")]
    FixtureInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl FeedError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store error from any displayable cause
    pub fn store(reason: impl std::fmt::Display) -> Self {
        Self::Store(reason.to_string())
    }

    /// Create a persistence error
    pub fn persistence(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if a manual retry of the same request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::OverlayStore(_) | Self::Persistence { .. } | Self::Io { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Store(_) => Some("The cursor was kept; trigger the fetch again to retry"),
            Self::CursorPhaseMismatch { .. } => Some("Reset the feed to start from a fresh cursor"),
            Self::InvalidPageSize(_) => Some("Set feed.page_size to a positive number"),
            Self::ConfigInvalid { .. } => Some("Run: feedpager config init --force"),
            _ => None,
        }
    }
}
