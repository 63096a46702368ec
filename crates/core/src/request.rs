//! Request identities and response snapshots.
//!
//! These are the values that flow between the router, the network and the
//! partition store. They are plain data; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::compute_cache_key;

/// Header names that describe a single hop and are never stored or replayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "content-length",
    "content-encoding",
];

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Absolute URL with the fragment removed.
    pub url: Url,
    /// Request headers, names lower-cased.
    pub headers: Vec<(String, String)>,
}

impl CacheRequest {
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url, headers: Vec::new() }
    }

    /// A plain `GET` for `url`, as issued for manifest entries.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A `GET` that accepts an HTML document, like a page navigation.
    pub fn navigation(url: Url) -> Self {
        Self::get(url).with_header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// First value of the header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Whether the request declares it accepts an HTML document.
    ///
    /// A request without an `Accept` header is not a navigation.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }

    /// Path component only; query and fragment excluded.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Storage key: SHA-256 of method and URL.
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.method, self.url.as_str())
    }
}

/// A stored or freshly fetched HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Only a plain `200 OK` may enter the cache from the cache-first path.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// A response that only makes sense for the request that produced it:
    /// `206 Partial Content` or `304 Not Modified`. Neither carries a full
    /// body, so neither is kept for later replay.
    pub fn is_partial(&self) -> bool {
        matches!(self.status, 206 | 304)
    }

    /// Drop hop-by-hop and transfer framing headers before storing or replaying.
    pub fn without_hop_headers(mut self) -> Self {
        self.headers
            .retain(|(name, _)| !HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)));
        self
    }
}
