// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{offline, round},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Mounts the round API (CORS restricted to the quiz app's origin).
/// * Routes everything else through the offline cache controller.
/// * Applies request tracing globally.
pub fn create_router(state: AppState) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    match HeaderValue::from_str(&state.config.origin_url.origin().ascii_serialization()) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!("Origin is not a valid CORS origin: {}", e),
    }

    let round_routes = Router::new()
        .route("/prepare", post(round::prepare_round))
        .route("/score", post(round::score_round))
        .route("/leaderboard", post(round::leaderboard));

    let controller_routes = Router::new().route("/status", get(offline::status));

    let api = Router::new()
        .nest("/api/rounds", round_routes)
        .nest("/api/controller", controller_routes)
        .layer(cors);

    Router::new()
        .merge(api)
        .fallback(offline::intercept)
        .layer(DefaultBodyLimit::max(offline::MAX_FORWARD_BODY))
        // Global Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
