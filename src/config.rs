// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use url::Url;

use crate::cache::{CacheGeneration, ControllerOptions, DEFAULT_GENERATION};

/// Selects the in-process cache store instead of SQLite.
pub const MEMORY_STORE: &str = "memory";

/// App shell, role landing pages, offline page, install assets and core sounds.
pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/student",
    "/teacher",
    "/offline",
    "/manifest.json",
    "/favicon.ico",
    "/icons/icon/512x512.png",
    "/sounds/correct.mp3",
    "/sounds/wrong.mp3",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub origin_url: Url,
    pub listen_addr: SocketAddr,
    pub cache_database_url: String,
    pub cache_generation: String,
    pub offline_url: String,
    pub precache_urls: Vec<String>,
    pub network_timeout_secs: u64,
    pub rust_log: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let origin_url: Url = env::var("ORIGIN_URL")
            .expect("ORIGIN_URL must be set")
            .parse()
            .expect("ORIGIN_URL must be an absolute URL");

        let listen_addr: SocketAddr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("LISTEN_ADDR must be host:port");

        let cache_database_url = env::var("CACHE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://asmath-cache.db".to_string());

        let cache_generation =
            env::var("CACHE_GENERATION").unwrap_or_else(|_| DEFAULT_GENERATION.to_string());

        let offline_url = env::var("OFFLINE_URL").unwrap_or_else(|_| "/offline".to_string());

        let precache_urls = env::var("PRECACHE_URLS")
            .map(|list| parse_list(&list))
            .unwrap_or_else(|_| DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect());

        let network_timeout_secs = env::var("NETWORK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            origin_url,
            listen_addr,
            cache_database_url,
            cache_generation,
            offline_url,
            precache_urls,
            network_timeout_secs,
            rust_log,
            log_dir,
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            generation: CacheGeneration::new(self.cache_generation.clone()),
            origin: self.origin_url.clone(),
            offline_path: self.offline_url.clone(),
            precache: self.precache_urls.clone(),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.cache_database_url == MEMORY_STORE
    }
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
