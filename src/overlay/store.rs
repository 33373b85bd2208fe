//! Overlay store abstraction

use crate::error::{FeedError, FeedResult};
use crate::overlay::{Overlay, OverlayEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Source of per-user overlay state
#[async_trait]
pub trait OverlayStore: Send + Sync {
    /// Fetch every overlay entry of a user
    async fn fetch_user_overlay(&self, user_id: &str) -> FeedResult<Overlay>;

    /// Write one overlay entry for a user
    async fn set_overlay(&self, user_id: &str, entry: &OverlayEntry) -> FeedResult<()>;
}

/// Overlay store held in process memory
#[derive(Debug, Default)]
pub struct MemoryOverlayStore {
    users: RwLock<HashMap<String, Overlay>>,
}

impl MemoryOverlayStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's overlay
    pub fn with_entries(self, user_id: &str, entries: impl IntoIterator<Item = OverlayEntry>) -> Self {
        {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            let overlay = users.entry(user_id.to_string()).or_default();
            for entry in entries {
                overlay.insert(entry.key.clone(), entry);
            }
        }
        self
    }

    /// Read one stored entry
    pub fn entry(&self, user_id: &str, key: &str) -> Option<OverlayEntry> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(user_id).and_then(|overlay| overlay.get(key)).cloned()
    }
}

#[async_trait]
impl OverlayStore for MemoryOverlayStore {
    async fn fetch_user_overlay(&self, user_id: &str) -> FeedResult<Overlay> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(user_id).cloned().unwrap_or_default())
    }

    async fn set_overlay(&self, user_id: &str, entry: &OverlayEntry) -> FeedResult<()> {
        if entry.key.is_empty() {
            return Err(FeedError::OverlayStore("overlay entry has an empty key".to_string()));
        }
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users
            .entry(user_id.to_string())
            .or_default()
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}
