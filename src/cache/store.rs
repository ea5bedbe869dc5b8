// src/cache/store.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::{request::RequestKey, response::StoredResponse};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache storage quota exceeded")]
    QuotaExceeded,
    #[error("cache storage backend failed: {0}")]
    Backend(String),
    #[error("cached entry is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // SQLITE_FULL
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("13") {
                return StoreError::QuotaExceeded;
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// Response storage partitioned by generation name.
///
/// Writes are last-write-wins overwrites of a whole entry; two concurrent
/// `put`s for the same key leave one complete entry behind.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Creates the generation's namespace if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), StoreError>;

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> Result<(), StoreError>;

    async fn lookup(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError>;

    /// Drops a whole generation. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, StoreError>;

    /// Names of all existing generations.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Number of entries held by a generation.
    async fn entries(&self, generation: &str) -> Result<usize, StoreError>;
}

/// In-process store. Optionally bounded, to exercise quota failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<BTreeMap<String, HashMap<RequestKey, StoredResponse>>>,
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects new entries once `capacity` entries exist across all generations.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: RwLock::default(),
            capacity: Some(capacity),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &str) -> Result<(), StoreError> {
        self.generations
            .write()
            .await
            .entry(generation.to_string())
            .or_default();
        Ok(())
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> Result<(), StoreError> {
        let mut generations = self.generations.write().await;

        if let Some(capacity) = self.capacity {
            let total: usize = generations.values().map(HashMap::len).sum();
            let overwrite = generations
                .get(generation)
                .is_some_and(|entries| entries.contains_key(key));
            if !overwrite && total >= capacity {
                return Err(StoreError::QuotaExceeded);
            }
        }

        generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn lookup(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn delete(&self, generation: &str) -> Result<bool, StoreError> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn entries(&self, generation: &str) -> Result<usize, StoreError> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation)
            .map_or(0, HashMap::len))
    }
}
