//! Cache entry for one feed query

use crate::cache::QueryId;
use crate::feed::{Cursor, CursorState, Item, PageResult, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Accumulated pages and resume position of one feed
///
/// `cursor`/`phase` always describe the *next* request, so a hydrated entry
/// continues exactly where the previous reader stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_id: QueryId,

    /// Items in append order, no two with the same key
    pub items: Vec<Item>,

    pub cursor: Option<Cursor>,

    pub phase: Phase,

    /// Every key ever delivered for this query
    pub seen_keys: HashSet<String>,

    /// False once the feed reached its terminal page
    pub has_more: bool,

    /// Pages appended so far
    pub pages: u32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh entry positioned at the start of the feed
    pub fn new(query_id: QueryId) -> Self {
        let now = Utc::now();
        Self {
            query_id,
            items: Vec::new(),
            cursor: None,
            phase: Phase::Primary,
            seen_keys: HashSet::new(),
            has_more: true,
            pages: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Position of the next request
    pub fn cursor_state(&self) -> CursorState {
        CursorState {
            cursor: self.cursor.clone(),
            phase: self.phase,
        }
    }

    /// Append a page, skipping keys already seen, and move to `next`
    ///
    /// `next = None` marks the feed as finished. Returns the appended items.
    pub fn append(&mut self, page: &PageResult, next: Option<CursorState>) -> Vec<Item> {
        let appended: Vec<Item> = page
            .items
            .iter()
            .filter(|item| self.seen_keys.insert(item.key.clone()))
            .cloned()
            .collect();
        self.items.extend(appended.iter().cloned());

        match next {
            Some(state) => {
                self.cursor = state.cursor;
                self.phase = state.phase;
                self.has_more = true;
            }
            None => {
                self.cursor = None;
                self.has_more = false;
            }
        }

        self.pages += 1;
        self.updated_at = Utc::now();
        appended
    }

    /// Mark the feed as finished without appending a page
    pub fn finish(&mut self) {
        self.cursor = None;
        self.has_more = false;
        self.updated_at = Utc::now();
    }

    /// Number of cached items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item was cached yet
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
