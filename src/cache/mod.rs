// src/cache/mod.rs

//! Offline cache controller: serves previously fetched pages and assets
//! when the network is unavailable.

pub mod controller;
pub mod network;
pub mod policy;
pub mod request;
pub mod response;
pub mod sqlite;
pub mod store;

use std::fmt;

pub use controller::{CacheController, ControllerOptions, FetchOutcome, Lifecycle, LifecycleEvent};
pub use network::{HttpNetwork, Network, NetworkError};
pub use request::{FetchRequest, RequestKey};
pub use response::StoredResponse;
pub use sqlite::SqliteStore;
pub use store::{CacheStore, MemoryStore, StoreError};

pub const DEFAULT_GENERATION: &str = "asmath-pwa-cache-v1";

/// Version tag partitioning the cache store. Changing it (or the precache
/// manifest) means every older generation is purged on activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheGeneration(String);

impl CacheGeneration {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CacheGeneration {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATION)
    }
}

impl fmt::Display for CacheGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
