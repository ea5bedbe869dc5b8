// src/cache/request.rs

use std::fmt;
use std::sync::LazyLock;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, header},
};
use regex::Regex;
use url::Url;

static IMAGE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp|avif|svg|ico|bmp)$").expect("image pattern is valid")
});
static AUDIO_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mp3|wav|ogg|oga|m4a|aac|flac)$").expect("audio pattern is valid")
});
static VIDEO_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mp4|webm|ogv|mov)$").expect("video pattern is valid"));

/// Whether the request loads a top-level page or something inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Subresource,
}

/// What the response will be used for, as reported by `Sec-Fetch-Dest` or
/// guessed from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Audio,
    Video,
    Script,
    Style,
    Font,
    Manifest,
    Other,
}

impl Destination {
    pub fn is_media(self) -> bool {
        matches!(self, Destination::Image | Destination::Audio | Destination::Video)
    }

    fn from_header(value: &str) -> Option<Self> {
        let destination = match value {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "audio" | "track" => Destination::Audio,
            "video" => Destination::Video,
            "script" | "worker" | "sharedworker" | "serviceworker" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => return None,
        };
        Some(destination)
    }

    fn from_path(path: &str) -> Self {
        if IMAGE_PATH.is_match(path) {
            Destination::Image
        } else if AUDIO_PATH.is_match(path) {
            Destination::Audio
        } else if VIDEO_PATH.is_match(path) {
            Destination::Video
        } else if path.ends_with(".js") || path.ends_with(".mjs") {
            Destination::Script
        } else if path.ends_with(".css") {
            Destination::Style
        } else if path.ends_with(".webmanifest") || path.ends_with("/manifest.json") {
            Destination::Manifest
        } else {
            Destination::Other
        }
    }
}

/// Identity of a cache entry: method plus URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.into(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    /// Plain subresource GET, destination guessed from the path.
    pub fn get(url: Url) -> Self {
        let destination = Destination::from_path(url.path());
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Subresource,
            destination,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Top-level page load.
    pub fn navigate(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Navigate,
            destination: Destination::Document,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Builds a request as received from a client, inferring mode and
    /// destination from the fetch metadata headers.
    ///
    /// Clients that send no `Sec-Fetch-Mode` are treated as navigating when
    /// they GET and prefer `text/html`.
    pub fn from_parts(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        let fetch_mode = header_str(&headers, "sec-fetch-mode");
        let navigating = match fetch_mode {
            Some(mode) => mode == "navigate",
            None => method == Method::GET && accepts_html(&headers),
        };

        let destination = header_str(&headers, "sec-fetch-dest")
            .and_then(Destination::from_header)
            .unwrap_or_else(|| Destination::from_path(url.path()));

        Self {
            method,
            url,
            mode: if navigating {
                RequestMode::Navigate
            } else {
                RequestMode::Subresource
            },
            destination,
            headers,
            body,
        }
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .is_some_and(|first| first.trim().starts_with("text/html"))
}
