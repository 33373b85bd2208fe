//! In-memory ordered store
//!
//! Reference `OrderedStore` over a vector of items. Cursor tokens have the
//! form `<sort value>:<key>` and resume strictly after that position, so a
//! deleted anchor row does not break continuation.

use crate::error::{FeedError, FeedResult};
use crate::feed::item::Item;
use crate::feed::query::{Filter, SortSpec};
use crate::feed::store::{OrderedStore, StorePage};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock};
use tokio::fs;
use tracing::debug;

/// Ordered store backed by a process-local vector
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: RwLock<Vec<Item>>,
    queries: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given items
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
            queries: AtomicUsize::new(0),
        }
    }

    /// Load items from a JSON array file
    pub async fn load_json(path: &Path) -> FeedResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FeedError::io(format!("reading fixture {}", path.display()), e))?;

        let items: Vec<Item> =
            serde_json::from_str(&content).map_err(|e| FeedError::FixtureInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!("Loaded {} items from {}", items.len(), path.display());
        Ok(Self::from_items(items))
    }

    /// Insert or replace an item by key
    pub fn insert(&self, item: Item) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter_mut().find(|existing| existing.key == item.key) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Remove an item, returning it if present
    pub fn remove(&self, key: &str) -> Option<Item> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let index = items.iter().position(|item| item.key == key)?;
        Some(items.remove(index))
    }

    /// Change an item's score, returning false if the key is unknown
    pub fn set_score(&self, key: &str, score: i64) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter_mut().find(|item| item.key == key) {
            Some(item) => {
                item.score = score;
                true
            }
            None => false,
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    /// Encode the resume position after `item`
    pub fn encode_cursor(sort: &SortSpec, item: &Item) -> String {
        format!("{}:{}", sort.sort_value(item), item.key)
    }

    fn decode_cursor(token: &str) -> FeedResult<(i64, &str)> {
        let (value, key) = token
            .split_once(':')
            .ok_or_else(|| FeedError::InvalidCursor(token.to_string()))?;
        let value = value
            .parse::<i64>()
            .map_err(|_| FeedError::InvalidCursor(token.to_string()))?;
        Ok((value, key))
    }
}

#[async_trait]
impl OrderedStore for InMemoryStore {
    async fn query(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        cursor: Option<&str>,
        page_size: usize,
    ) -> FeedResult<StorePage> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);

        let anchor = cursor.map(Self::decode_cursor).transpose()?;

        let mut matching: Vec<Item> = {
            let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
            items.iter().filter(|item| filter.matches(item)).cloned().collect()
        };
        matching.sort_by(|a, b| sort.compare(a, b));

        let rows: Vec<Item> = matching
            .into_iter()
            .filter(|item| match anchor {
                Some((value, key)) => {
                    sort.compare_position(sort.sort_value(item), &item.key, value, key)
                        == Ordering::Greater
                }
                None => true,
            })
            .take(page_size)
            .collect();

        let next_cursor = rows.last().map(|last| Self::encode_cursor(sort, last));

        Ok(StorePage { rows, next_cursor })
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
