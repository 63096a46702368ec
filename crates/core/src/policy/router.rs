//! Pure request classification.

use super::settings::CacheSettings;
use crate::request::CacheRequest;

/// Why a request is not intercepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bypass {
    /// Anything but `GET`.
    Method,
    /// The path starts with one of the excluded prefixes.
    ExcludedPrefix(String),
}

/// What the worker does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the host sends it to the network untouched.
    Passthrough(Bypass),
    /// Live network preferred, stored copy or offline page on failure.
    NetworkFirst { cache_name: String },
    /// Stored copy preferred, network only on a miss.
    CacheFirst { cache_name: String },
}

impl Route {
    /// Short label for logs.
    pub fn strategy(&self) -> &'static str {
        match self {
            Route::Passthrough(_) => "passthrough",
            Route::NetworkFirst { .. } => "network-first",
            Route::CacheFirst { .. } => "cache-first",
        }
    }
}

/// Classify `request`; the first matching rule wins.
///
/// 1. non-`GET` passes through
/// 2. excluded path prefixes pass through
/// 3. HTML-accepting requests are network-first
/// 4. everything else is cache-first
pub fn route(settings: &CacheSettings, request: &CacheRequest) -> Route {
    if !request.is_get() {
        return Route::Passthrough(Bypass::Method);
    }

    if let Some(prefix) = settings.excluded_prefix(request.path()) {
        return Route::Passthrough(Bypass::ExcludedPrefix(prefix.to_string()));
    }

    if request.accepts_html() {
        return Route::NetworkFirst { cache_name: settings.dynamic_cache.clone() };
    }

    Route::CacheFirst { cache_name: settings.dynamic_cache.clone() }
}
