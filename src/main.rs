// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use asmath::cache::{CacheController, CacheStore, HttpNetwork, MemoryStore, SqliteStore};
use asmath::config::Config;
use asmath::routes;
use asmath::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "asmath.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store = open_store(&config).await;

    let network = HttpNetwork::new(Duration::from_secs(config.network_timeout_secs))
        .expect("Failed to build HTTP client");

    let controller = CacheController::new(config.controller_options(), store, Arc::new(network))
        .expect("Invalid precache or offline URL");
    let controller = Arc::new(controller);

    // Install and activate before the first request is intercepted
    match controller.start().await {
        Ok((installed, activated)) => tracing::info!(
            "Controller ready: {} precached, {} skipped, {} stale generations purged",
            installed.cached.len(),
            installed.failed.len(),
            activated.purged.len()
        ),
        Err(e) => panic!("Failed to start cache controller: {}", e),
    }

    let state = AppState {
        controller: controller.clone(),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    tracing::info!(
        "Listening on {}, proxying {}",
        config.listen_addr,
        config.origin_url
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("Failed to bind listen address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Let in-flight background refreshes land in the cache
    controller.settle().await;
    tracing::info!("Shut down cleanly");
}

/// Opens the configured cache store, retrying SQLite a few times.
async fn open_store(config: &Config) -> Arc<dyn CacheStore> {
    if config.uses_memory_store() {
        tracing::info!("Using in-memory cache store");
        return Arc::new(MemoryStore::new());
    }

    let mut retry_count = 0;
    loop {
        match SqliteStore::connect(&config.cache_database_url).await {
            Ok(store) => {
                tracing::info!("Cache store opened at {}", config.cache_database_url);
                return Arc::new(store);
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open cache store after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Cache store not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
