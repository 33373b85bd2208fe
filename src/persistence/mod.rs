//! Key/value persistence port
//!
//! Resumable state (cached feed entries, last active query) is stored through
//! this port so hydration logic stays storage-agnostic.

pub mod file;

pub use file::FilePersistence;

use crate::error::FeedResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Injected key/value storage
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> FeedResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> FeedResult<()>;

    /// Delete a value; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> FeedResult<()>;
}

/// In-memory persistence, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPersistence {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn get(&self, key: &str) -> FeedResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> FeedResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> FeedResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
