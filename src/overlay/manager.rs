//! Per-user overlay snapshot with optimistic writes
//!
//! Local changes are visible to the next `merged` call immediately. The write
//! to the overlay store is confirmed afterwards; a failed confirmation puts
//! the entry back to its pre-change value unless it was changed again in the
//! meantime.

use crate::error::FeedResult;
use crate::events::{EventBus, FeedEvent};
use crate::feed::Item;
use crate::overlay::store::OverlayStore;
use crate::overlay::{merge, Overlay, OverlayEntry};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct OverlayState {
    entries: Overlay,
    /// Keys with an unconfirmed local write, mapped to the write id
    pending: HashMap<String, u64>,
    /// Id of the latest local write per key, confirmed or not
    last_write: HashMap<String, u64>,
    next_write: u64,
}

/// An optimistic change awaiting store confirmation
struct PendingWrite {
    write_id: u64,
    previous: Option<OverlayEntry>,
    next: OverlayEntry,
}

/// Owns one user's overlay and mediates writes to the overlay store
pub struct OverlayManager {
    user_id: String,
    store: Arc<dyn OverlayStore>,
    state: RwLock<OverlayState>,
    bus: Option<Arc<EventBus>>,
}

impl OverlayManager {
    /// Create a manager with an empty snapshot
    pub fn new(user_id: impl Into<String>, store: Arc<dyn OverlayStore>) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            state: RwLock::new(OverlayState::default()),
            bus: None,
        }
    }

    /// Publish `OverlayChanged` on every local change
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Get the user this overlay belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Overlay {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Current entry for a key
    pub fn entry(&self, key: &str) -> Option<OverlayEntry> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(key)
            .cloned()
    }

    /// Items with the current overlay applied
    pub fn merged(&self, items: &[Item]) -> Vec<Item> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        merge(items, &state.entries)
    }

    /// Whether any item is still unflagged after merging
    pub fn has_unflagged(&self, items: &[Item]) -> bool {
        self.merged(items).iter().any(|item| !item.liked)
    }

    /// Reload the overlay from the store
    ///
    /// On failure the previous snapshot is kept and `false` is returned; the
    /// error never reaches the page-fetch path. Entries with an unconfirmed
    /// local write, or written locally after the load started, keep their
    /// local value.
    pub async fn refresh(&self) -> bool {
        let started = self.write_state().next_write;

        match self.store.fetch_user_overlay(&self.user_id).await {
            Ok(mut fresh) => {
                let mut state = self.write_state();
                let local_keys: Vec<String> = state
                    .last_write
                    .iter()
                    .filter(|(key, write_id)| **write_id > started || state.pending.contains_key(*key))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in &local_keys {
                    match state.entries.get(key) {
                        Some(local) => {
                            fresh.insert(key.clone(), local.clone());
                        }
                        None => {
                            fresh.remove(key);
                        }
                    }
                }
                debug!("Loaded {} overlay entries for {}", fresh.len(), self.user_id);
                state.entries = fresh;
                true
            }
            Err(e) => {
                warn!("Overlay load failed for {}, keeping previous snapshot: {}", self.user_id, e);
                false
            }
        }
    }

    /// Flip the flag on an item, optimistically
    ///
    /// Returns the confirmed entry, or the store error after rolling back.
    pub async fn toggle_like(&self, item: &Item) -> FeedResult<OverlayEntry> {
        let pending = {
            let mut state = self.write_state();
            let current = state
                .entries
                .get(&item.key)
                .cloned()
                .unwrap_or_else(|| OverlayEntry::from_item(item));
            let next = current.toggled();
            Self::apply(&mut state, next)
        };
        self.notify(&item.key);

        let result = self.store.set_overlay(&self.user_id, &pending.next).await;
        self.settle(pending, result)
    }

    /// Flag every item not flagged yet (e.g. mark all notifications read)
    ///
    /// Each write is confirmed independently; failed ones are rolled back and
    /// the first error is returned after all writes settled.
    pub async fn mark_all(&self, items: &[Item]) -> FeedResult<usize> {
        let targets: Vec<Item> = self.merged(items).into_iter().filter(|item| !item.liked).collect();

        let mut marked = 0;
        let mut first_error = None;

        for item in &targets {
            let pending = {
                let mut state = self.write_state();
                Self::apply(&mut state, OverlayEntry::new(item.key.clone(), true, item.count))
            };
            self.notify(&item.key);

            let result = self.store.set_overlay(&self.user_id, &pending.next).await;
            match self.settle(pending, result) {
                Ok(_) => marked += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if marked > 0 {
            if let Some(bus) = &self.bus {
                bus.publish(FeedEvent::NotificationsChanged {
                    user_id: self.user_id.clone(),
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(marked),
        }
    }

    fn apply(state: &mut OverlayState, next: OverlayEntry) -> PendingWrite {
        state.next_write += 1;
        let write_id = state.next_write;
        let previous = state.entries.insert(next.key.clone(), next.clone());
        state.pending.insert(next.key.clone(), write_id);
        state.last_write.insert(next.key.clone(), write_id);
        PendingWrite {
            write_id,
            previous,
            next,
        }
    }

    fn settle(&self, pending: PendingWrite, result: FeedResult<()>) -> FeedResult<OverlayEntry> {
        let key = pending.next.key.clone();
        let rolled_back = {
            let mut state = self.write_state();
            if state.pending.get(&key) == Some(&pending.write_id) {
                state.pending.remove(&key);
            }

            match &result {
                Err(_) if state.entries.get(&key) == Some(&pending.next) => {
                    match pending.previous {
                        Some(previous) => state.entries.insert(key.clone(), previous),
                        None => state.entries.remove(&key),
                    };
                    true
                }
                _ => false,
            }
        };

        match result {
            Ok(()) => Ok(pending.next),
            Err(e) => {
                if rolled_back {
                    warn!("Overlay write for {} failed, rolled back: {}", key, e);
                    self.notify(&key);
                }
                Err(e)
            }
        }
    }

    fn notify(&self, key: &str) {
        if let Some(bus) = &self.bus {
            bus.publish(FeedEvent::OverlayChanged {
                user_id: self.user_id.clone(),
                key: key.to_string(),
            });
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, OverlayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
