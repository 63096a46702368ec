//! laojobs-sw entry point.
//!
//! Boots the offline worker in front of the job site: opens the partition
//! store, resumes the worker recorded by the last run, registers the worker
//! for the configured settings and serves every request through it. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use url::Url;

use laojobs_client::{FetchClient, FetchConfig, LocalHost, Registration};
use laojobs_core::CacheDb;
use laojobs_core::config::AppConfig;

mod error;
mod handler;

/// Shared state behind every request.
pub struct AppState {
    pub origin: Url,
    pub registration: Registration,
    pub client: FetchClient,
    pub host: Arc<LocalHost>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let origin = config.origin_url()?;
    let settings = config.cache_settings()?;

    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let client = FetchClient::new(FetchConfig::from_app_config(&config))?;
    let host = Arc::new(LocalHost::new());
    let registration = Registration::new(cache.clone(), Arc::new(client.clone()), host.clone());

    // The recorded worker keeps serving from its partitions if the origin is
    // down and the update below fails.
    match registration.restore(&settings.scope).await {
        Ok(Some(version)) => tracing::info!(%version, "resumed recorded worker"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not resume recorded worker"),
    }

    // Without a worker every request is passed through, so a failed first
    // install is not fatal.
    match registration.update(settings).await {
        Ok(outcome) => tracing::info!(?outcome, "worker registered"),
        Err(e) => tracing::error!(error = %e, "worker install failed; serving without offline support"),
    }

    let state = AppState { origin, registration, client, host };
    let app = handler::create_router(Arc::new(state));

    let listen_addr = &config.listen_addr;
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "laojobs-sw listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if let Err(e) = cache.close().await {
        tracing::warn!(error = %e, "cache database did not close cleanly");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
