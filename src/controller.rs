//! Infinite-scroll feed controller
//!
//! Schedules page fetches from a visibility signal under a single-flight
//! rule: a fetch is issued only when the sentinel is visible, no fetch is in
//! flight, and the feed has more pages. Because at most one fetch is
//! outstanding, pages are appended strictly in request order.
//!
//! There is no cancellation token. A disposed or reset controller discards a
//! late-arriving result instead of applying it; timeouts belong to the store.

use crate::cache::{FeedCache, QueryId};
use crate::error::{FeedError, FeedResult};
use crate::events::{EventBus, FeedEvent, SubscriptionId, Subscribers};
use crate::feed::{Item, PaginatedFetcher, Phase};
use crate::overlay::{OverlayEntry, OverlayManager};
use futures_util::future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Notification delivered to page listeners
#[derive(Debug, Clone, PartialEq)]
pub struct PageAppended {
    pub query_id: QueryId,
    /// Phase the page was read from
    pub phase: Phase,
    /// Newly appended items, overlay applied
    pub items: Vec<Item>,
    /// Items in the feed after the append
    pub total: usize,
    pub has_more: bool,
}

/// Why a trigger did not issue a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Sentinel not visible
    NotVisible,
    /// Another fetch is still outstanding
    InFlight,
    /// Feed reached its terminal page
    Exhausted,
    /// Entry was adopted from the cache, nothing to load
    Hydrated,
    /// Controller was disposed
    Disposed,
}

/// Result of a fetch trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was fetched and appended
    Appended { appended: usize, total: usize },
    /// No fetch was issued
    Skipped(SkipReason),
    /// The fetch completed after a reset or dispose; its result was dropped
    Discarded,
}

/// Settled fetch, before overlay merge and delivery
enum Completion {
    Skipped(SkipReason),
    Discarded,
    Page {
        phase: Phase,
        items: Vec<Item>,
        total: usize,
        has_more: bool,
    },
}

#[derive(Debug)]
struct ControllerState {
    in_flight: bool,
    has_more: bool,
    /// Bumped by reset/dispose; completions from an older generation are stale
    generation: u64,
    disposed: bool,
    /// Entry was adopted from the cache at mount; cleared by reset
    hydrated: bool,
    last_error: Option<String>,
}

/// Drives one feed: fetches pages on demand and appends them to the cache
pub struct FeedController {
    query_id: QueryId,
    fetcher: PaginatedFetcher,
    cache: Arc<FeedCache>,
    overlay: Option<Arc<OverlayManager>>,
    bus: Arc<EventBus>,
    listeners: Subscribers<PageAppended>,
    state: Mutex<ControllerState>,
}

impl FeedController {
    /// Mount a controller for `query_id`
    ///
    /// A cached entry is adopted synchronously: no fetch and no loading
    /// state. Without one, the first trigger performs a cold fetch.
    pub fn mount(query_id: QueryId, fetcher: PaginatedFetcher, cache: Arc<FeedCache>) -> Self {
        let cached = cache.get(&query_id);
        let has_more = cached.as_ref().map_or(true, |entry| entry.has_more);

        if let Some(entry) = &cached {
            debug!(
                "Hydrated {} from cache: {} items, {} phase",
                query_id,
                entry.len(),
                entry.phase
            );
        }

        Self {
            query_id,
            fetcher,
            cache,
            overlay: None,
            bus: EventBus::global(),
            listeners: Subscribers::new(),
            state: Mutex::new(ControllerState {
                in_flight: false,
                has_more,
                generation: 0,
                disposed: false,
                hydrated: cached.is_some(),
                last_error: None,
            }),
        }
    }

    /// Merge this overlay into every delivered page
    pub fn with_overlay(mut self, overlay: Arc<OverlayManager>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Publish feed events on `bus` instead of the global bus
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Get the query identity
    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }

    /// Whether the controller adopted a cached entry at mount and was not reset since
    pub fn is_hydrated(&self) -> bool {
        self.lock_state().hydrated
    }

    /// Whether more pages may be fetched
    pub fn has_more(&self) -> bool {
        self.lock_state().has_more
    }

    /// Whether a fetch is outstanding
    pub fn is_fetching(&self) -> bool {
        self.lock_state().in_flight
    }

    /// Message of the last failed fetch, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// All items fetched so far, overlay applied
    pub fn items(&self) -> Vec<Item> {
        let items = self
            .cache
            .get(&self.query_id)
            .map(|entry| entry.items)
            .unwrap_or_default();
        self.apply_overlay(items)
    }

    /// Subscribe to appended pages
    pub fn on_page_appended<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PageAppended) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Remove a page listener
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Initial load: first page and overlay, concurrently
    ///
    /// The page is delivered once both loads settled, so listeners see it
    /// merged with the fresh overlay. A hydrated controller only refreshes
    /// the overlay.
    pub async fn start(&self) -> FeedResult<FetchOutcome> {
        let refresh_overlay = async {
            if let Some(overlay) = &self.overlay {
                overlay.refresh().await;
            }
        };

        if self.is_hydrated() {
            refresh_overlay.await;
            return Ok(FetchOutcome::Skipped(SkipReason::Hydrated));
        }

        let (completion, ()) = future::join(self.fetch_page(), refresh_overlay).await;
        Ok(self.deliver(completion?))
    }

    /// Visibility signal from the list sentinel
    pub async fn on_sentinel_visible(&self, visible: bool) -> FeedResult<FetchOutcome> {
        if !visible {
            return Ok(FetchOutcome::Skipped(SkipReason::NotVisible));
        }
        self.fetch_next().await
    }

    /// Fetch and append the next page if allowed
    ///
    /// On a store error `in_flight` is cleared and `has_more` is kept, so the
    /// same cursor can be retried. Structural errors end the feed and mark
    /// the cache entry finished.
    pub async fn fetch_next(&self) -> FeedResult<FetchOutcome> {
        let completion = self.fetch_page().await?;
        Ok(self.deliver(completion))
    }

    async fn fetch_page(&self) -> FeedResult<Completion> {
        let (generation, cursor_state, seen) = {
            let mut state = self.lock_state();
            if state.disposed {
                return Ok(Completion::Skipped(SkipReason::Disposed));
            }
            if state.in_flight {
                return Ok(Completion::Skipped(SkipReason::InFlight));
            }
            if !state.has_more {
                return Ok(Completion::Skipped(SkipReason::Exhausted));
            }
            state.in_flight = true;

            let (cursor_state, seen) = self
                .cache
                .get(&self.query_id)
                .map(|entry| (entry.cursor_state(), entry.seen_keys))
                .unwrap_or_default();
            (state.generation, cursor_state, seen)
        };

        debug!(
            "Fetching {} at {} phase (cursor: {})",
            self.query_id,
            cursor_state.phase,
            cursor_state.cursor.is_some()
        );
        let result = self.fetcher.fetch_next_page(&cursor_state, &seen).await;

        let mut state = self.lock_state();
        state.in_flight = false;

        if state.disposed || state.generation != generation {
            debug!("Discarding stale page for {}", self.query_id);
            return Ok(Completion::Discarded);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                if !e.is_retryable() {
                    state.has_more = false;
                    self.cache.finish(&self.query_id);
                }
                state.last_error = Some(e.to_string());
                warn!("Fetch failed for {}: {}", self.query_id, e);
                return Err(e);
            }
        };

        let next = self.fetcher.next_state(&page);
        let (items, total) = self.cache.append_page(&self.query_id, &page, next.clone());
        state.has_more = next.is_some();
        state.last_error = None;

        Ok(Completion::Page {
            phase: page.phase,
            items,
            total,
            has_more: state.has_more,
        })
    }

    /// Merge an appended page with the overlay and notify listeners
    fn deliver(&self, completion: Completion) -> FetchOutcome {
        let (phase, items, total, has_more) = match completion {
            Completion::Skipped(reason) => return FetchOutcome::Skipped(reason),
            Completion::Discarded => return FetchOutcome::Discarded,
            Completion::Page {
                phase,
                items,
                total,
                has_more,
            } => (phase, items, total, has_more),
        };

        let items = self.apply_overlay(items);
        let appended = items.len();
        if !has_more {
            info!("Feed {} finished with {} items", self.query_id, total);
        }

        self.listeners.publish(&PageAppended {
            query_id: self.query_id.clone(),
            phase,
            items,
            total,
            has_more,
        });
        self.bus.publish(FeedEvent::PageAppended {
            query_id: self.query_id.clone(),
            appended,
            total,
        });

        FetchOutcome::Appended { appended, total }
    }

    /// Drop the cached entry and start the feed over
    ///
    /// An outstanding fetch is not interrupted; its result is discarded and
    /// the next trigger after it settles fetches the first page again.
    pub fn reset(&self) {
        {
            let mut state = self.lock_state();
            state.generation += 1;
            state.has_more = true;
            state.hydrated = false;
            state.last_error = None;
            self.cache.reset(&self.query_id);
        }
        self.bus.publish(FeedEvent::FeedReset {
            query_id: self.query_id.clone(),
        });
    }

    /// Stop applying results; late completions are discarded
    pub fn dispose(&self) {
        let mut state = self.lock_state();
        state.disposed = true;
        state.generation += 1;
        debug!("Disposed controller for {}", self.query_id);
    }

    /// Toggle the overlay flag of a fetched item
    pub async fn toggle_like(&self, key: &str) -> FeedResult<OverlayEntry> {
        let overlay = self
            .overlay
            .as_ref()
            .ok_or_else(|| FeedError::OverlayMissing(self.query_id.to_string()))?;

        let item = self
            .cache
            .get(&self.query_id)
            .and_then(|entry| entry.items.into_iter().find(|item| item.key == key))
            .ok_or_else(|| FeedError::ItemNotFound {
                query_id: self.query_id.to_string(),
                key: key.to_string(),
            })?;

        overlay.toggle_like(&item).await
    }

    fn apply_overlay(&self, items: Vec<Item>) -> Vec<Item> {
        match &self.overlay {
            Some(overlay) => overlay.merged(&items),
            None => items,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
