//! Per-user overlay state (like / read flags) layered onto shared items
//!
//! The overlay is sourced independently of the page fetch and combined only
//! at the read-only [`merge`] step.

pub mod manager;
pub mod store;

pub use manager::OverlayManager;
pub use store::{MemoryOverlayStore, OverlayStore};

use crate::feed::Item;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One per-user annotation, keyed by item key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEntry {
    pub key: String,
    pub liked: bool,
    pub count: u64,
}

impl OverlayEntry {
    /// Create an overlay entry
    pub fn new(key: impl Into<String>, liked: bool, count: u64) -> Self {
        Self {
            key: key.into(),
            liked,
            count,
        }
    }

    /// Entry mirroring an item's own flag and counter
    pub fn from_item(item: &Item) -> Self {
        Self::new(item.key.clone(), item.liked, item.count)
    }

    /// The entry after flipping the flag, counter moved by one and floored at zero
    pub fn toggled(&self) -> Self {
        let count = if self.liked {
            self.count.saturating_sub(1)
        } else {
            self.count + 1
        };
        Self::new(self.key.clone(), !self.liked, count)
    }
}

/// Overlay snapshot keyed by item key
pub type Overlay = HashMap<String, OverlayEntry>;

/// Apply overlay values onto items
///
/// Items with an overlay entry take its `liked`/`count`; all others are
/// returned unchanged.
pub fn merge(items: &[Item], overlay: &Overlay) -> Vec<Item> {
    items
        .iter()
        .map(|item| match overlay.get(&item.key) {
            Some(entry) => Item {
                liked: entry.liked,
                count: entry.count,
                ..item.clone()
            },
            None => item.clone(),
        })
        .collect()
}
