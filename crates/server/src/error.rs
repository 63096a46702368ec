//! Errors that end a proxied request.
//!
//! Worker errors keep the status from [`laojobs_core::Error::http_status`];
//! a navigation with nothing to show gets the built-in offline page.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use laojobs_core::Error;
use laojobs_core::config::ConfigError;

/// Shown when a page is neither reachable nor cached, and the offline
/// fallback page was never installed either.
const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="lo">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>ອອບລາຍ</title></head>
<body><h1>ທ່ານກຳລັງອອບລາຍ</h1><p>ກະລຸນາກວດສອບການເຊື່ອມຕໍ່ອິນເຕີເນັດ ແລ້ວລອງໃໝ່.</p></body>
</html>
"#;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No worker has activated yet.
    #[error("NO_CONTROLLER: no active worker")]
    NoController,

    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidInput(_) | ProxyError::Config(_) => StatusCode::BAD_REQUEST,
            ProxyError::NoController => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Worker(e) => StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }

        match self {
            ProxyError::Worker(Error::OfflineUnavailable(_)) => {
                (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], OFFLINE_PAGE).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
