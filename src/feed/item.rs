//! Feed item record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single record read from the ordered store
///
/// `key` is stable across fetches of the same underlying record; every
/// dedup and overlay lookup goes through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, stable record key
    pub key: String,

    /// Popularity score (e.g. like count at write time)
    #[serde(default)]
    pub score: i64,

    /// Creation time, used by recency ordering
    pub created_at: DateTime<Utc>,

    /// Whether the current user has flagged this item (like / read)
    #[serde(default)]
    pub liked: bool,

    /// Displayed counter for the flag
    #[serde(default)]
    pub count: u64,

    /// Opaque display fields
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    /// Create an item with an empty payload
    pub fn new(key: impl Into<String>, score: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            score,
            created_at,
            liked: false,
            count: score.max(0) as u64,
            payload: serde_json::Map::new(),
        }
    }

    /// Attach a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Read a payload field as a non-blank string
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.payload
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}
