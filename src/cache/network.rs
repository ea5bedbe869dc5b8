// src/cache/network.rs

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use thiserror::Error;

use crate::cache::{request::FetchRequest, response::StoredResponse};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Largest upstream body buffered for a client or the cache.
pub const MAX_RESPONSE_BODY: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out")]
    Timeout,
    #[error("response body exceeds {0} bytes")]
    TooLarge(usize),
    #[error("could not build network client: {0}")]
    Client(String),
}

/// The path every non-cached answer comes from.
#[async_trait]
pub trait Network: Send + Sync {
    /// Resolves to any HTTP response the origin produced, including error
    /// statuses. Only transport failures are `Err`.
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, NetworkError>;
}

/// Network access over HTTP via reqwest. Redirects are returned, not followed.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    body_limit: usize,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;

        Ok(Self {
            client,
            body_limit: MAX_RESPONSE_BODY,
        })
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, NetworkError> {
        let mut response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(forwardable(&request.headers))
            .body(request.body.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        if response
            .content_length()
            .is_some_and(|len| len > self.body_limit as u64)
        {
            return Err(NetworkError::TooLarge(self.body_limit));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.body_limit {
                return Err(NetworkError::TooLarge(self.body_limit));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(StoredResponse::new(status, headers, body))
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn strips_connection_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:3000"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("accept", HeaderValue::from_static("text/html"));

        let forwarded = forwardable(&headers);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded["accept"], "text/html");
    }
}
