// src/handlers/offline.rs

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};

use crate::{
    cache::{CacheController, FetchOutcome, FetchRequest},
    error::AppError,
};

/// Largest request body forwarded upstream; larger ones get `413`.
pub const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

/// Reports the controller's lifecycle state and cache generations.
pub async fn status(
    State(controller): State<Arc<CacheController>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(controller.status().await?))
}

/// Interception hook: every request not handled by the API lands here.
///
/// The controller answers from its policy table; requests it does not
/// intercept go to the network untouched.
pub async fn intercept(
    State(controller): State<Arc<CacheController>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let url = controller.resolve(&uri)?;
    let fetch = FetchRequest::from_parts(method, url, headers, body);

    let response = match controller.handle_fetch(&fetch).await {
        FetchOutcome::Respond(response) => response,
        FetchOutcome::PassThrough => controller.pass_through(&fetch).await,
    };

    Ok(response.into_response())
}
