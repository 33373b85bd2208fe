//! Publish/subscribe service for cross-component notifications
//!
//! A process-wide [`EventBus`] is created on first use and never torn down;
//! individual listeners are removed with [`EventBus::unsubscribe`].

use crate::cache::QueryId;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Handle returned by `subscribe`, used to unsubscribe
pub type SubscriptionId = Uuid;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of listeners for one event type
pub struct Subscribers<E> {
    listeners: RwLock<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> Subscribers<E> {
    /// Create an empty listener list
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener, returning false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener in subscription order
    ///
    /// Listeners run outside the lock and may (un)subscribe re-entrantly.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers").field("len", &self.len()).finish()
    }
}

/// Events published on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A page was appended to a feed's cache entry
    PageAppended {
        query_id: QueryId,
        appended: usize,
        total: usize,
    },
    /// A feed was reset to a fresh cache entry
    FeedReset { query_id: QueryId },
    /// A user's overlay entry changed locally
    OverlayChanged { user_id: String, key: String },
    /// A user's notification list should be reloaded
    NotificationsChanged { user_id: String },
}

static GLOBAL_BUS: Lazy<Arc<EventBus>> = Lazy::new(|| Arc::new(EventBus::new()));

/// Publish/subscribe hub for [`FeedEvent`]s
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Subscribers<FeedEvent>,
}

impl EventBus {
    /// Create a standalone bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus
    pub fn global() -> Arc<EventBus> {
        Arc::clone(&GLOBAL_BUS)
    }

    /// Register a listener for every event
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Deliver an event to all listeners
    pub fn publish(&self, event: FeedEvent) {
        let delivered = self.subscribers.publish(&event);
        debug!("Published {:?} to {} listener(s)", event, delivered);
    }

    /// Number of registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
