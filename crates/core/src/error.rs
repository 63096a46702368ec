//! Unified error types for the offline worker.
//!
//! Every variant renders with a stable code prefix so log lines and the
//! proxy's error pages can be grepped by failure class.

use tokio_rusqlite::rusqlite;

use crate::lifecycle::WorkerState;

/// Unified error types for the offline worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed push payload).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The network could not produce a response at all.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A manifest URL could not be fetched during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    /// Navigation failed and neither the page nor the offline fallback is cached.
    #[error("OFFLINE_UNAVAILABLE: {0}")]
    OfflineUnavailable(String),

    /// Worker lifecycle transition not permitted.
    #[error("INVALID_TRANSITION: {from} -> {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },
}

impl Error {
    /// HTTP status the proxy answers with when this error ends a request.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => 400,
            Error::CacheMiss(_) => 404,
            Error::Network(_) | Error::FetchTooLarge(_) => 502,
            Error::OfflineUnavailable(_) => 503,
            Error::Database(_)
            | Error::MigrationFailed(_)
            | Error::CorruptEntry(_)
            | Error::InstallFailed { .. }
            | Error::InvalidTransition { .. } => 500,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}
