//! HTTP surface of the proxy host.
//!
//! Everything outside `/__worker/` is a browser request for the job site. It
//! is offered to the controlling worker first; when the worker does not
//! intercept it (or no worker is active yet) it goes straight to the origin.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use laojobs_client::fetch::resolve_on_origin;
use laojobs_client::worker::{ClickDecision, Notification, RegistrationStatus, UpdateOutcome};
use laojobs_client::{ExtendableEvent, FetchOutcome};
use laojobs_core::config::AppConfig;
use laojobs_core::{CacheRequest, Error, StoredResponse};

use crate::AppState;
use crate::error::ProxyError;

/// Build the axum [`Router`] with the host endpoints and the proxy fallback.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/__worker/status", get(handle_status))
        .route("/__worker/push", post(handle_push))
        .route("/__worker/notificationclick", post(handle_notification_click))
        .route("/__worker/sync/{tag}", post(handle_sync))
        .route("/__worker/update", post(handle_update))
        .fallback(handle_proxy)
        .with_state(state)
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<RegistrationStatus> {
    Json(state.registration.status().await)
}

/// Deliver a push message to the active worker.
async fn handle_push(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ProxyError> {
    let manager = state.registration.controller().await.ok_or(ProxyError::NoController)?;
    match manager.handle_push(Some(body.as_ref())).await? {
        Some(notification) => Ok((StatusCode::CREATED, Json(notification)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct ClickRequest {
    notification: Notification,
    /// Absent when the notification body was clicked.
    #[serde(default)]
    action: Option<String>,
}

async fn handle_notification_click(
    State(state): State<Arc<AppState>>, Json(click): Json<ClickRequest>,
) -> Result<Json<ClickDecision>, ProxyError> {
    let manager = state.registration.controller().await.ok_or(ProxyError::NoController)?;
    let decision = manager
        .handle_notification_click(&click.notification, click.action.as_deref())
        .await?;
    Ok(Json(decision))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    tag: String,
    handled: bool,
}

async fn handle_sync(
    State(state): State<Arc<AppState>>, Path(tag): Path<String>,
) -> Result<Json<SyncResponse>, ProxyError> {
    let manager = state.registration.controller().await.ok_or(ProxyError::NoController)?;
    let handled = manager.handle_sync(&tag).await?;
    Ok(Json(SyncResponse { tag, handled }))
}

/// Reload configuration and run the update algorithm with it.
///
/// Only the cache settings can change at runtime; a different origin needs
/// a restart.
async fn handle_update(State(state): State<Arc<AppState>>) -> Result<Json<UpdateOutcome>, ProxyError> {
    let config = AppConfig::load()?;
    if config.origin_url()? != state.origin {
        return Err(ProxyError::InvalidInput(format!(
            "origin changed from {} to {}; restart to apply",
            state.origin, config.origin
        )));
    }
    let outcome = state.registration.update(config.cache_settings()?).await?;
    info!(?outcome, "update finished");
    Ok(Json(outcome))
}

async fn handle_proxy(
    State(state): State<Arc<AppState>>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes,
) -> Result<Response, ProxyError> {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = resolve_on_origin(&state.origin, target).map_err(Error::from)?;
    let headers = header_pairs(&headers);

    let request = headers
        .iter()
        .fold(CacheRequest::new(method.as_str(), url.clone()), |request, (name, value)| {
            request.with_header(name, value)
        });

    if request.is_get() && request.accepts_html() {
        state.host.record_navigation(&url).await;
    }

    if let Some(manager) = state.registration.controller().await {
        let mut event = ExtendableEvent::new();
        let outcome = manager.handle_fetch(&request, &mut event).await;
        if event.pending() > 0 {
            tokio::spawn(event.settled());
        }

        match outcome? {
            FetchOutcome::Response { response, source } => {
                debug!(%url, ?source, status = response.status, "served by worker");
                return Ok(to_http(response));
            }
            FetchOutcome::NotHandled(bypass) => debug!(%url, ?bypass, "passing through"),
        }
    }

    let response = state.client.forward(method.as_str(), &url, &headers, body).await?;
    Ok(to_http(response))
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

fn to_http(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(stored.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in &stored.headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "dropping unrepresentable header"),
        }
    }
    response
}
