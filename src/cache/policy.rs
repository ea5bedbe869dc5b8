// src/cache/policy.rs

use axum::http::Method;
use url::Url;

use crate::cache::request::FetchRequest;

/// Routing policy for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Same-origin page load: network first, then cache, then offline page.
    Navigation,
    /// Image, audio or video from any origin: cache first, refreshed in the background.
    Media,
    /// Any other same-origin GET: cache first, refreshed in the background.
    StaticAsset,
    /// Left to the network untouched and never stored.
    PassThrough,
}

/// Picks the policy for `request` given the app's origin.
///
/// Non-GET requests always pass through: a mutation response must never be
/// replayed from cache.
pub fn classify(request: &FetchRequest, origin: &Url) -> RequestClass {
    if request.method != Method::GET {
        return RequestClass::PassThrough;
    }

    let same_origin = request.url.origin() == origin.origin();

    if request.is_navigation() {
        if same_origin {
            RequestClass::Navigation
        } else {
            RequestClass::PassThrough
        }
    } else if request.destination.is_media() {
        RequestClass::Media
    } else if same_origin {
        RequestClass::StaticAsset
    } else {
        RequestClass::PassThrough
    }
}
