//! File-backed persistence
//!
//! One file per key under a directory. File names are the first 16 bytes of
//! the key's SHA-256, hex encoded, so arbitrary keys map to safe names.

use crate::error::{FeedError, FeedResult};
use crate::persistence::Persistence;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Persistence storing each value in its own file
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Create a store rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the value of `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        self.dir.join(format!("{}.json", hex::encode(&digest[..16])))
    }
}

#[async_trait]
impl Persistence for FilePersistence {
    async fn get(&self, key: &str) -> FeedResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| FeedError::io(format!("reading {}", path.display()), e))?;
        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: &str) -> FeedResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| FeedError::io(format!("creating {}", self.dir.display()), e))?;

        let path = self.path_for(key);
        fs::write(&path, value)
            .await
            .map_err(|e| FeedError::io(format!("writing {}", path.display()), e))?;

        debug!("Persisted {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> FeedResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| FeedError::io(format!("removing {}", path.display()), e))?;
        }
        Ok(())
    }
}
