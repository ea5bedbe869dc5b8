// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{cache::CacheController, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<CacheController>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<CacheController> {
    fn from_ref(state: &AppState) -> Self {
        state.controller.clone()
    }
}
