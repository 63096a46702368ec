//! HTTP network access for the worker.
//!
//! ### The `Network` seam
//! - Strategies only ever talk to [`Network`], so tests can script the
//!   network and count calls.
//! - [`FetchClient`] is the reqwest-backed implementation.
//!
//! ### What counts as a network failure
//! - Transport errors (DNS, connect, timeout, reset) and oversized bodies.
//! - Any HTTP status, including 4xx/5xx, is a *response*, not a failure.
//!
//! ### Conditional and range requests
//! - [`Network::fetch`] drops validators and `Range` so the worker always gets
//!   a full response it can store and replay to any later request.
//! - [`FetchClient::forward`] passes them through; the browser owns its own
//!   HTTP cache for pass-through traffic.
//!
//! ### Redirects
//! - [`Network::fetch`] follows up to `max_redirects` redirects.
//! - [`FetchClient::forward`] never follows them; pass-through traffic hands
//!   redirects (and their cookies) back to the browser untouched.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve_on_origin};

use laojobs_core::{CacheRequest, Error, StoredResponse};

/// Request headers never forwarded upstream.
const SKIP_REQUEST_HEADERS: &[&str] = &["host", "connection", "content-length", "transfer-encoding", "accept-encoding"];

/// Headers that make the origin answer `304` or `206` instead of a full body.
const CONDITIONAL_REQUEST_HEADERS: &[&str] =
    &["if-none-match", "if-modified-since", "if-match", "if-unmodified-since", "if-range", "range"];

/// Something that can turn a request into a response over the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request`. `Err` means no response was obtained at all.
    async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "laojobs-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "laojobs-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &laojobs_core::config::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    passthrough: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let build = |policy: reqwest::redirect::Policy| {
            Client::builder()
                .user_agent(&config.user_agent)
                .timeout(config.timeout)
                .redirect(policy)
                .use_rustls_tls()
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))
        };

        let http = build(reqwest::redirect::Policy::limited(config.max_redirects))?;
        let passthrough = build(reqwest::redirect::Policy::none())?;

        Ok(Self { http, passthrough, config })
    }

    /// Send an arbitrary request upstream without caching semantics.
    ///
    /// Used for pass-through traffic (mutations, API, admin); the body is
    /// forwarded as-is and redirects are returned, not followed.
    pub async fn forward(
        &self, method: &str, url: &::url::Url, headers: &[(String, String)], body: Bytes,
    ) -> Result<StoredResponse, Error> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let request = with_headers(self.passthrough.request(method, url.as_str()), headers, &[]).body(body);
        self.send(url, request).await
    }

    async fn send(&self, url: &::url::Url, request: reqwest::RequestBuilder) -> Result<StoredResponse, Error> {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout fetching {url}"))
            } else {
                Error::Network(format!("network error: {}", e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = collect_headers(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(StoredResponse { status: status.as_u16(), headers, body: bytes.to_vec() }.without_hop_headers())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, Error> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let builder = with_headers(
            self.http.request(method, request.url.as_str()),
            &request.headers,
            CONDITIONAL_REQUEST_HEADERS,
        );
        self.send(&request.url, builder).await
    }
}

fn with_headers(
    mut builder: reqwest::RequestBuilder, headers: &[(String, String)], also_skip: &[&str],
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        let skipped = |list: &[&str]| list.iter().any(|skip| name.eq_ignore_ascii_case(skip));
        if skipped(SKIP_REQUEST_HEADERS) || skipped(also_skip) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn collect_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}
