// src/cache/response.rs

use axum::{
    body::{Body, Bytes},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

/// Marks responses synthesized by the controller instead of the origin.
pub const FALLBACK_HEADER: &str = "x-offline-fallback";

/// Headers addressed to one client; never replayed from the shared cache.
const PRIVATE_HEADERS: &[&str] = &["set-cookie", "set-cookie2"];

/// The last-resort answer for each request class when both network and
/// cache come up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The cached offline page standing in for a navigation.
    OfflinePage,
    /// Navigation with nothing cached at all.
    Page,
    Asset,
    Media,
}

impl Fallback {
    pub fn as_str(self) -> &'static str {
        match self {
            Fallback::OfflinePage => "offline-page",
            Fallback::Page => "page",
            Fallback::Asset => "asset",
            Fallback::Media => "media",
        }
    }
}

/// A response as held in the cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub fetched_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Synthesized response for a request that neither network nor cache can serve.
    pub fn unavailable(kind: Fallback) -> Self {
        let (status, body): (u16, &'static str) = match kind {
            Fallback::Asset => (503, "Offline and resource not cached."),
            Fallback::Page | Fallback::OfflinePage => (503, "Offline and page not cached."),
            Fallback::Media => (504, ""),
        };
        let mut headers = vec![(FALLBACK_HEADER.to_string(), kind.as_str().to_string())];
        if !body.is_empty() {
            headers.push(("content-type".to_string(), "text/plain; charset=utf-8".to_string()));
        }
        Self::new(status, headers, Bytes::from_static(body.as_bytes()))
    }

    /// Answer for a pass-through request whose upstream could not be reached.
    pub fn bad_gateway() -> Self {
        Self::new(
            502,
            vec![("content-type".to_string(), "text/plain; charset=utf-8".to_string())],
            Bytes::from_static(b"Upstream unreachable."),
        )
    }

    /// Only complete `200 OK` responses that the origin allows a shared
    /// cache to keep.
    pub fn is_cacheable(&self) -> bool {
        if self.status != 200 {
            return false;
        }
        let Some(cache_control) = self.header("cache-control") else {
            return true;
        };
        !cache_control.split(',').map(str::trim).any(|directive| {
            directive.eq_ignore_ascii_case("no-store") || directive.eq_ignore_ascii_case("private")
        })
    }

    /// Copy fit for the shared cache, without per-client headers.
    pub fn shareable(&self) -> Self {
        let mut shared = self.clone();
        shared
            .headers
            .retain(|(name, _)| !PRIVATE_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)));
        shared
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn fallback_kind(&self) -> Option<&str> {
        self.header(FALLBACK_HEADER)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

impl IntoResponse for StoredResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("Dropping unrepresentable header {}", name),
            }
        }

        response
    }
}
