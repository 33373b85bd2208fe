//! Process-wide feed cache keyed by query identity
//!
//! Lets a reader leave a feed and come back without re-fetching: a mounted
//! controller adopts the cached entry synchronously before any network call.
//!
//! # Entry Lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | First fetch | Entry created |
//! | Page fetched | Page appended (dedup by key) |
//! | Caller reset | New entry replaces the old one |
//!
//! Entries never expire on their own; staleness is the caller's call.

pub mod entry;

pub use entry::CacheEntry;

use crate::error::FeedResult;
use crate::feed::{CursorState, Item, PageResult};
use crate::persistence::Persistence;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Identity of a feed query (e.g. `likedPosts`, `feed:{uid}`, `places:{keyword}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Wrap a raw query identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Posts the current user liked
    pub fn liked_posts() -> Self {
        Self::new("likedPosts")
    }

    /// A user's post feed
    pub fn feed(uid: &str) -> Self {
        Self::new(format!("feed:{}", uid))
    }

    /// Recommended places for a keyword
    pub fn places(keyword: &str) -> Self {
        Self::new(format!("places:{}", keyword))
    }

    /// A user's notification list
    pub fn notifications(uid: &str) -> Self {
        Self::new(format!("notifications:{}", uid))
    }

    /// Get the raw identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the entry is persisted
    pub fn persistence_key(&self) -> String {
        format!("feed-cache:{}", self.0)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static GLOBAL_CACHE: Lazy<Arc<FeedCache>> = Lazy::new(|| Arc::new(FeedCache::new()));

/// Cache of feed entries, one per query identity
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: RwLock<HashMap<QueryId, CacheEntry>>,
}

impl FeedCache {
    /// Create a standalone cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache
    pub fn global() -> Arc<FeedCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Copy of the entry for a query
    pub fn get(&self, query_id: &QueryId) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query_id)
            .cloned()
    }

    /// Whether an entry exists for a query
    pub fn contains(&self, query_id: &QueryId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(query_id)
    }

    /// Store an entry under `query_id`, replacing any previous one
    ///
    /// The entry is re-keyed to `query_id` if it carries another id.
    pub fn put(&self, query_id: QueryId, mut entry: CacheEntry) {
        if entry.query_id != query_id {
            debug!("Re-keying entry of {} to {}", entry.query_id, query_id);
            entry.query_id = query_id.clone();
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query_id, entry);
    }

    /// Append a page to a query's entry, creating the entry if absent
    ///
    /// Items whose key the entry has already seen are dropped. Returns the
    /// appended items and the entry's new total.
    pub fn append_page(
        &self,
        query_id: &QueryId,
        page: &PageResult,
        next: Option<CursorState>,
    ) -> (Vec<Item>, usize) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(query_id.clone())
            .or_insert_with(|| CacheEntry::new(query_id.clone()));

        let appended = entry.append(page, next);
        debug!(
            "Appended {} of {} items to {} ({} total)",
            appended.len(),
            page.items.len(),
            query_id,
            entry.len()
        );
        (appended, entry.len())
    }

    /// Mark a query's feed as finished, creating the entry if absent
    ///
    /// A later mount then adopts the terminal state instead of retrying.
    pub fn finish(&self, query_id: &QueryId) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(query_id.clone())
            .or_insert_with(|| CacheEntry::new(query_id.clone()))
            .finish();
        debug!("Marked {} as finished", query_id);
    }

    /// Replace a query's entry with a fresh one
    pub fn reset(&self, query_id: &QueryId) -> CacheEntry {
        let entry = CacheEntry::new(query_id.clone());
        self.put(query_id.clone(), entry.clone());
        info!("Reset cache entry for {}", query_id);
        entry
    }

    /// Number of cached queries
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist a query's entry, returning false if there is none
    pub async fn save_to(&self, query_id: &QueryId, persistence: &dyn Persistence) -> FeedResult<bool> {
        let Some(entry) = self.get(query_id) else {
            return Ok(false);
        };
        let content = serde_json::to_string(&entry)?;
        persistence.set(&query_id.persistence_key(), &content).await?;
        debug!("Saved {} items of {}", entry.len(), query_id);
        Ok(true)
    }

    /// Restore a query's entry from persistence, returning false if none was stored
    pub async fn load_from(&self, query_id: &QueryId, persistence: &dyn Persistence) -> FeedResult<bool> {
        let Some(content) = persistence.get(&query_id.persistence_key()).await? else {
            return Ok(false);
        };
        let entry: CacheEntry = serde_json::from_str(&content)?;
        debug!("Restored {} items of {}", entry.len(), query_id);
        self.put(query_id.clone(), entry);
        Ok(true)
    }
}
