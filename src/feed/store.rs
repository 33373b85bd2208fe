//! Ordered store abstraction
//!
//! Read port over the remote, externally ordered collection. Implementations
//! own timeouts and snapshot consistency; the pagination core assumes that an
//! unchanged collection queried with an unchanged cursor returns the same rows.

use crate::error::FeedResult;
use crate::feed::item::Item;
use crate::feed::query::{Filter, SortSpec};
use async_trait::async_trait;

/// Rows returned by one store query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePage {
    /// Rows in store order, at most `page_size`
    pub rows: Vec<Item>,
    /// Token resuming strictly after the last row, `None` when no rows came back
    pub next_cursor: Option<String>,
}

/// Abstract ordered collection interface
///
/// Implementations must honor `SortSpec::compare`, including the key
/// tie-break, so page boundaries are deterministic across repeated queries.
#[async_trait]
pub trait OrderedStore: Send + Sync {
    /// Read up to `page_size` rows matching `filter` in `sort` order,
    /// starting strictly after `cursor`
    async fn query(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        cursor: Option<&str>,
        page_size: usize,
    ) -> FeedResult<StorePage>;

    /// Get the human-readable store name for display
    fn store_name(&self) -> &'static str;
}
