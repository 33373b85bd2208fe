//! Phase-aware page fetcher
//!
//! Reads one page per call from the ordered store and decides where the next
//! request starts:
//!
//! | Current | Rows returned | Next request |
//! |---------|---------------|--------------|
//! | Primary | `== page_size` | Primary, advanced cursor |
//! | Primary | `< page_size` | Fallback, no cursor (or terminal without fallback) |
//! | Fallback | `== page_size` | Fallback, advanced cursor |
//! | Fallback | `< page_size` | terminal |
//!
//! When the primary population is an exact multiple of the page size, the
//! switch costs one extra, empty primary query. The store has no count
//! capability, so that query is the only way to observe the end of the phase.

use crate::error::{FeedError, FeedResult};
use crate::feed::cursor::{Cursor, CursorState, PageResult, Phase};
use crate::feed::item::Item;
use crate::feed::query::FeedSpec;
use crate::feed::store::OrderedStore;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Caller-supplied predicate dropping items that cannot be displayed
pub type ValidityFilter = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// Fetches pages of one feed from an ordered store
#[derive(Clone)]
pub struct PaginatedFetcher {
    store: Arc<dyn OrderedStore>,
    spec: FeedSpec,
    validity: Option<ValidityFilter>,
}

impl fmt::Debug for PaginatedFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedFetcher")
            .field("store", &self.store.store_name())
            .field("spec", &self.spec)
            .field("validity", &self.validity.is_some())
            .finish()
    }
}

impl PaginatedFetcher {
    /// Create a fetcher for a feed spec
    pub fn new(store: Arc<dyn OrderedStore>, spec: FeedSpec) -> Self {
        Self {
            store,
            spec,
            validity: None,
        }
    }

    /// Drop items failing `predicate` after each fetch
    ///
    /// Dropped items are not backfilled, so a page may come back shorter
    /// than `page_size`.
    pub fn with_validity<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Item) -> bool + Send + Sync + 'static,
    {
        self.validity = Some(Arc::new(predicate));
        self
    }

    /// Get the feed spec
    pub fn spec(&self) -> &FeedSpec {
        &self.spec
    }

    /// Fetch the page at `state`, dropping keys already in `seen`
    ///
    /// `exhausted` is computed from the raw row count, before any filtering.
    pub async fn fetch_next_page(
        &self,
        state: &CursorState,
        seen: &HashSet<String>,
    ) -> FeedResult<PageResult> {
        let phase_spec = self
            .spec
            .phase(state.phase)
            .ok_or(FeedError::PhaseUnavailable(state.phase))?;

        if let Some(cursor) = &state.cursor {
            if cursor.phase != state.phase {
                return Err(FeedError::CursorPhaseMismatch {
                    expected: state.phase,
                    found: cursor.phase,
                });
            }
        }

        let token = state.cursor.as_ref().map(|c| c.token.as_str());
        let page = self
            .store
            .query(&phase_spec.filter, &phase_spec.sort, token, self.spec.page_size)
            .await?;

        let fetched = page.rows.len();
        let exhausted = fetched < self.spec.page_size;

        let mut rows = page.rows;
        rows.sort_by(|a, b| phase_spec.sort.compare(a, b));

        let mut page_keys = HashSet::with_capacity(fetched);
        let items: Vec<Item> = rows
            .into_iter()
            .filter(|item| !seen.contains(&item.key))
            .filter(|item| page_keys.insert(item.key.clone()))
            .filter(|item| self.validity.as_ref().map_or(true, |valid| valid(item)))
            .collect();

        debug!(
            "Fetched {} rows from {} ({} phase, {}), kept {}",
            fetched,
            self.store.store_name(),
            state.phase,
            phase_spec.sort,
            items.len()
        );

        Ok(PageResult {
            items,
            next_cursor: page.next_cursor.map(|token| Cursor {
                phase: state.phase,
                token,
            }),
            phase: state.phase,
            exhausted,
            fetched,
        })
    }

    /// Position of the request following `page`, `None` once the feed is done
    pub fn next_state(&self, page: &PageResult) -> Option<CursorState> {
        match (page.phase, page.exhausted) {
            (phase, false) => Some(CursorState {
                cursor: page.next_cursor.clone(),
                phase,
            }),
            (Phase::Primary, true) if self.spec.fallback.is_some() => {
                info!("Primary phase exhausted, switching to fallback ordering");
                Some(CursorState::start_of(Phase::Fallback))
            }
            _ => None,
        }
    }
}
