//! Configuration schema for feedpager
//!
//! Configuration is stored at `~/.config/feedpager/config.toml`

use crate::error::FeedResult;
use crate::feed::FeedSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Feed defaults
    pub feed: FeedConfig,

    /// Resume state settings
    pub persistence: PersistenceConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Feed pagination defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Items requested per page
    pub page_size: usize,

    /// Minimum score for the popular phase
    pub popularity_threshold: i64,

    /// Drop items without a non-empty `image` field
    pub skip_missing_image: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            popularity_threshold: 10,
            skip_missing_image: true,
        }
    }
}

impl FeedConfig {
    /// Build the feed specification these defaults describe
    pub fn feed_spec(&self, recent_only: bool) -> FeedResult<FeedSpec> {
        if recent_only {
            FeedSpec::recent(self.page_size)
        } else {
            FeedSpec::popular_then_recent(self.popularity_threshold, self.page_size)
        }
    }
}

/// Persistence of cached feeds between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Save and restore cache entries
    pub enabled: bool,

    /// Directory for saved entries (default: state dir)
    pub dir: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}
