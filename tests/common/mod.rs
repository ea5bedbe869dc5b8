// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use asmath::{
    cache::{
        CacheController, CacheGeneration, CacheStore, ControllerOptions, FetchRequest, MemoryStore,
        Network, NetworkError, RequestKey, StoreError, StoredResponse,
    },
    config::{Config, MEMORY_STORE},
    routes,
    state::AppState,
};
use async_trait::async_trait;
use url::Url;

pub const ORIGIN: &str = "http://quiz.test";
pub const GENERATION: &str = "asmath-test-v2";

/// Scripted origin: serves registered bodies, 404 otherwise, and can be
/// switched offline as a whole or per URL.
#[derive(Default)]
pub struct FakeNetwork {
    online: AtomicBool,
    pages: Mutex<HashMap<String, Page>>,
    broken: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

#[derive(Clone)]
struct Page {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        let network = Self::default();
        network.online.store(true, Ordering::SeqCst);
        Arc::new(network)
    }

    pub fn serve(&self, path: &str, status: u16, body: &str) {
        self.serve_with_headers(path, status, body, &[]);
    }

    /// Like `serve`, with extra response headers after `content-type`.
    pub fn serve_with_headers(&self, path: &str, status: u16, body: &str, extra: &[(&str, &str)]) {
        let mut headers = vec![("content-type".to_string(), "text/html".to_string())];
        headers.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        self.pages.lock().unwrap().insert(
            url(path).to_string(),
            Page {
                status,
                headers,
                body: body.to_string(),
            },
        );
    }

    /// Makes a single URL fail at the transport level.
    pub fn break_url(&self, path: &str) {
        self.broken.lock().unwrap().insert(url(path).to_string());
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every URL fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.to_string());

        if !self.online.load(Ordering::SeqCst)
            || self.broken.lock().unwrap().contains(request.url.as_str())
        {
            return Err(NetworkError::Unreachable("connection refused".to_string()));
        }

        let page = self.pages.lock().unwrap().get(request.url.as_str()).cloned();
        let page = page.unwrap_or_else(|| Page {
            status: 404,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: "not found".to_string(),
        });
        Ok(StoredResponse::new(page.status, page.headers, page.body))
    }
}

/// Store operations `FailingStore` can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Put,
    Lookup,
    Delete,
    Keys,
}

/// Memory store whose chosen operations fail with the given error kind.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<StoreOp>>,
    corrupt: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Failures report a corrupt entry instead of a backend error.
    pub fn report_corrupt(&self) {
        self.corrupt.store(true, Ordering::SeqCst);
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if !self.failing.lock().unwrap().contains(&op) {
            return Ok(());
        }
        if self.corrupt.load(Ordering::SeqCst) {
            Err(StoreError::Corrupt(format!("{op:?} hit a damaged row")))
        } else {
            Err(StoreError::Backend(format!("{op:?} failed")))
        }
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, generation: &str) -> Result<(), StoreError> {
        self.inner.open(generation).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::Put)?;
        self.inner.put(generation, key, response).await
    }

    async fn lookup(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError> {
        self.check(StoreOp::Lookup)?;
        self.inner.lookup(generation, key).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::Delete)?;
        self.inner.delete(generation).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check(StoreOp::Keys)?;
        self.inner.keys().await
    }

    async fn entries(&self, generation: &str) -> Result<usize, StoreError> {
        self.inner.entries(generation).await
    }
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn options(precache: &[&str]) -> ControllerOptions {
    ControllerOptions {
        generation: CacheGeneration::new(GENERATION),
        origin: Url::parse(ORIGIN).unwrap(),
        offline_path: "/offline".to_string(),
        precache: precache.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn controller(
    network: Arc<FakeNetwork>,
    store: Arc<dyn CacheStore>,
    precache: &[&str],
) -> CacheController {
    CacheController::new(options(precache), store, network).unwrap()
}

pub fn body(response: &StoredResponse) -> String {
    String::from_utf8(response.body.to_vec()).unwrap()
}

/// Router over an already started controller with an in-memory store.
pub async fn app(network: Arc<FakeNetwork>, precache: &[&str]) -> axum::Router {
    let controller = controller(network, Arc::new(MemoryStore::new()), precache);
    controller.start().await.unwrap();

    let config = Config {
        origin_url: ORIGIN.parse().unwrap(),
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        cache_database_url: MEMORY_STORE.to_string(),
        cache_generation: GENERATION.to_string(),
        offline_url: "/offline".to_string(),
        precache_urls: precache.iter().map(|p| p.to_string()).collect(),
        network_timeout_secs: 1,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
    };

    routes::create_router(AppState {
        controller: Arc::new(controller),
        config,
    })
}
