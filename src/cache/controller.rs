// src/cache/controller.rs

use std::sync::Arc;

use axum::http::Uri;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinSet,
};
use url::Url;

use crate::cache::{
    CacheGeneration,
    network::Network,
    policy::{RequestClass, classify},
    request::{FetchRequest, RequestKey},
    response::{FALLBACK_HEADER, Fallback, StoredResponse},
    store::{CacheStore, StoreError},
};

/// Lifecycle of the controller. Requests are only intercepted once `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Typed input to the controller.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
}

#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Fetched(FetchOutcome),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("cannot {event} while {state:?}")]
    InvalidTransition {
        state: Lifecycle,
        event: &'static str,
    },
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("{0} is not on the app origin")]
    ForeignTarget(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the controller decided for one intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    Respond(StoredResponse),
    /// Not intercepted; the caller goes to the network itself.
    PassThrough,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub purged: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub state: Lifecycle,
    pub generation: String,
    pub generations: Vec<String>,
    pub entries: usize,
}

/// Deployment-time settings of the controller.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub generation: CacheGeneration,
    /// Origin of the quiz app; decides same-origin classification.
    pub origin: Url,
    /// Path of the page served for navigations that cannot be answered.
    pub offline_path: String,
    /// Paths fetched and stored at install time.
    pub precache: Vec<String>,
}

/// Offline cache controller.
///
/// Owns the cache store lifecycle and answers intercepted requests with one
/// of the policies in [`RequestClass`].
pub struct CacheController {
    generation: CacheGeneration,
    origin: Url,
    offline_key: RequestKey,
    manifest: Vec<Url>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    state: RwLock<Lifecycle>,
    refreshes: Mutex<JoinSet<()>>,
}

impl CacheController {
    pub fn new(
        options: ControllerOptions,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Result<Self, ControllerError> {
        let resolve = |path: &str| {
            options
                .origin
                .join(path)
                .map_err(|source| ControllerError::InvalidUrl {
                    url: path.to_string(),
                    source,
                })
        };

        let offline_url = resolve(options.offline_path.as_str())?;
        let manifest = options
            .precache
            .iter()
            .map(|path| resolve(path.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            generation: options.generation,
            offline_key: RequestKey::new(&axum::http::Method::GET, &offline_url),
            origin: options.origin,
            manifest,
            store,
            network,
            state: RwLock::new(Lifecycle::Parsed),
            refreshes: Mutex::new(JoinSet::new()),
        })
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.state.read().await
    }

    /// Absolute URL on the origin for an intercepted request target.
    ///
    /// Origin-form targets keep only their path and query, so `//host/x` stays
    /// a path on the origin. Absolute-form targets must name the origin itself.
    pub fn resolve(&self, uri: &Uri) -> Result<Url, ControllerError> {
        if uri.scheme().is_some() || uri.authority().is_some() {
            let target = uri.to_string();
            let url = Url::parse(&target).map_err(|source| ControllerError::InvalidUrl {
                url: target.clone(),
                source,
            })?;
            if url.origin() != self.origin.origin() {
                return Err(ControllerError::ForeignTarget(target));
            }
            return Ok(url);
        }

        let path_and_query = uri.path_and_query();
        let mut url = self.origin.clone();
        url.set_path(path_and_query.map_or("/", |pq| pq.path()));
        url.set_query(path_and_query.and_then(|pq| pq.query()));
        url.set_fragment(None);
        Ok(url)
    }

    /// Install, then activate and claim straight away.
    pub async fn start(&self) -> Result<(InstallReport, ActivationReport), ControllerError> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<EventOutcome, ControllerError> {
        match event {
            LifecycleEvent::Install => self.install().await.map(EventOutcome::Installed),
            LifecycleEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            LifecycleEvent::Fetch(request) => {
                Ok(EventOutcome::Fetched(self.handle_fetch(&request).await))
            }
        }
    }

    /// Populates the current generation from the precache manifest.
    ///
    /// Best effort per entry: a missing asset is logged and skipped, and the
    /// controller still reaches `Installed`.
    pub async fn install(&self) -> Result<InstallReport, ControllerError> {
        self.transition(Lifecycle::Parsed, Lifecycle::Installing, "install")
            .await?;
        tracing::info!(
            "Installing cache generation {} ({} precache entries)",
            self.generation,
            self.manifest.len()
        );

        if let Err(e) = self.store.open(self.generation.as_str()).await {
            tracing::warn!("Failed to open cache generation {}: {}", self.generation, e);
        }

        let mut report = InstallReport::default();
        for url in &self.manifest {
            let request = FetchRequest::get(url.clone());
            let key = request.key();

            let outcome = match self.network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => self
                    .store
                    .put(self.generation.as_str(), &key, &response.shareable())
                    .await
                    .map_err(|e| e.to_string()),
                Ok(response) => Err(format!("not cacheable (status {})", response.status)),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => report.cached.push(url.to_string()),
                Err(reason) => {
                    tracing::warn!("Skipping precache of {}: {}", url, reason);
                    report.failed.push(url.to_string());
                }
            }
        }

        *self.state.write().await = Lifecycle::Installed;
        tracing::info!(
            "Installed generation {}: {} cached, {} skipped",
            self.generation,
            report.cached.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Deletes every generation but the current one, then takes over
    /// interception immediately.
    pub async fn activate(&self) -> Result<ActivationReport, ControllerError> {
        self.transition(Lifecycle::Installed, Lifecycle::Activating, "activate")
            .await?;

        let mut report = ActivationReport::default();
        match self.store.keys().await {
            Ok(generations) => {
                for stale in generations.into_iter().filter(|g| g != self.generation.as_str()) {
                    match self.store.delete(&stale).await {
                        Ok(_) => {
                            tracing::info!("Purged stale cache generation {}", stale);
                            report.purged.push(stale);
                        }
                        Err(e) => tracing::warn!("Failed to purge generation {}: {}", stale, e),
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to list cache generations: {}", e),
        }

        *self.state.write().await = Lifecycle::Active;
        tracing::info!("Cache generation {} active, clients claimed", self.generation);
        Ok(report)
    }

    /// Answers one intercepted request.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        if self.lifecycle().await != Lifecycle::Active {
            return FetchOutcome::PassThrough;
        }

        let class = classify(request, &self.origin);
        tracing::debug!("{} {} -> {:?}", request.method, request.url, class);

        match class {
            RequestClass::Navigation => FetchOutcome::Respond(self.network_first(request).await),
            RequestClass::Media => {
                FetchOutcome::Respond(self.cache_first(request, Fallback::Media).await)
            }
            RequestClass::StaticAsset => {
                FetchOutcome::Respond(self.cache_first(request, Fallback::Asset).await)
            }
            RequestClass::PassThrough => FetchOutcome::PassThrough,
        }
    }

    /// Default network path for requests the controller does not intercept.
    pub async fn pass_through(&self, request: &FetchRequest) -> StoredResponse {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Upstream failed for {} {}: {}", request.method, request.url, e);
                StoredResponse::bad_gateway()
            }
        }
    }

    /// Waits for every background refresh started so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.refreshes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Background refresh task failed: {}", e);
            }
        }
    }

    pub async fn status(&self) -> Result<ControllerStatus, ControllerError> {
        Ok(ControllerStatus {
            state: self.lifecycle().await,
            generation: self.generation.to_string(),
            generations: self.store.keys().await?,
            entries: self.store.entries(self.generation.as_str()).await?,
        })
    }

    async fn transition(
        &self,
        from: Lifecycle,
        to: Lifecycle,
        event: &'static str,
    ) -> Result<(), ControllerError> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(ControllerError::InvalidTransition {
                state: *state,
                event,
            });
        }
        *state = to;
        Ok(())
    }

    async fn network_first(&self, request: &FetchRequest) -> StoredResponse {
        let key = request.key();

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_quietly(&key, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!("Navigation to {} failed, falling back to cache: {}", key.url, e);

                if let Some(hit) = self.lookup_quietly(&key).await {
                    return hit;
                }
                match self.lookup_quietly(&self.offline_key).await {
                    Some(offline) => {
                        offline.with_header(FALLBACK_HEADER, Fallback::OfflinePage.as_str())
                    }
                    None => StoredResponse::unavailable(Fallback::Page),
                }
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest, fallback: Fallback) -> StoredResponse {
        let key = request.key();

        if let Some(hit) = self.lookup_quietly(&key).await {
            self.spawn_refresh(request.clone(), key).await;
            return hit;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_quietly(&key, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!("Fetch of {} failed with nothing cached: {}", key.url, e);
                // A concurrent request may have filled the entry meanwhile.
                match self.lookup_quietly(&key).await {
                    Some(hit) => hit,
                    None => StoredResponse::unavailable(fallback),
                }
            }
        }
    }

    /// Re-fetches `request` off the caller's path and overwrites the entry on success.
    async fn spawn_refresh(&self, request: FetchRequest, key: RequestKey) {
        let store = Arc::clone(&self.store);
        let network = Arc::clone(&self.network);
        let generation = self.generation.clone();

        let mut refreshes = self.refreshes.lock().await;
        while refreshes.try_join_next().is_some() {}

        refreshes.spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    let shared = response.shareable();
                    if let Err(e) = store.put(generation.as_str(), &key, &shared).await {
                        tracing::warn!("Background refresh could not store {}: {}", key, e);
                    } else {
                        tracing::debug!("Refreshed {}", key);
                    }
                }
                Ok(response) => {
                    tracing::debug!("Background refresh of {} got status {}", key, response.status)
                }
                Err(e) => tracing::debug!("Background refresh of {} failed: {}", key, e),
            }
        });
    }

    async fn lookup_quietly(&self, key: &RequestKey) -> Option<StoredResponse> {
        match self.store.lookup(self.generation.as_str(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", key, e);
                None
            }
        }
    }

    async fn store_quietly(&self, key: &RequestKey, response: &StoredResponse) {
        if let Err(e) = self
            .store
            .put(self.generation.as_str(), key, &response.shareable())
            .await
        {
            tracing::warn!("Cache write for {} failed: {}", key, e);
        }
    }
}
