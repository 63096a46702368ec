//! URL canonicalization for consistent cache keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for laojobs_core::Error {
    fn from(err: UrlError) -> Self {
        laojobs_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a URL string so equal resources map to one cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a request target (`/path?query`) or absolute URL against `origin`.
///
/// Paths resolve on the origin; absolute URLs are canonicalized as-is.
pub fn resolve_on_origin(origin: &url::Url, target: &str) -> Result<url::Url, UrlError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(UrlError::Empty);
    }
    if target.contains("://") {
        return canonicalize(target);
    }
    // `//host/...` would resolve to another host.
    if !target.starts_with('/') || target.starts_with("//") {
        return Err(UrlError::InvalidUrl(format!("{target}: expected an absolute path")));
    }
    let mut joined = origin.join(target).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    joined.set_fragment(None);
    Ok(joined)
}
