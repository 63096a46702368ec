//! Registration: the update algorithm for a single scope.
//!
//! The registration owns the active worker. An update with new settings
//! installs a fresh worker; a failed install leaves the current one in
//! control. A successful install skips waiting: the new worker activates
//! at once, the previous one becomes redundant, and open clients are
//! claimed without a reload.
//!
//! Each activation is recorded in the cache database. On startup
//! [`Registration::restore`] puts the recorded worker back in control from
//! its stored partitions, so a restart does not depend on the origin being
//! reachable.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

use laojobs_core::{CacheDb, CacheSettings, Error, WorkerState};

use super::host::WorkerHost;
use super::manager::OfflineCacheManager;
use crate::fetch::Network;

#[derive(Debug, Clone)]
struct ActiveWorker {
    manager: OfflineCacheManager,
    state: WorkerState,
}

/// Snapshot of one worker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub version: String,
    pub state: WorkerState,
    pub static_cache: String,
    pub dynamic_cache: String,
}

/// Snapshot of the registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub last_error: Option<String>,
}

/// What an update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum UpdateOutcome {
    /// The settings match the active worker.
    Unchanged,
    /// A new worker installed and took control.
    Activated { version: String, deleted: Vec<String> },
}

/// Holds the controlling worker for one scope.
pub struct Registration {
    cache: CacheDb,
    network: Arc<dyn Network>,
    host: Arc<dyn WorkerHost>,
    active: RwLock<Option<ActiveWorker>>,
    last_error: RwLock<Option<String>>,
    updating: Mutex<()>,
}

impl Registration {
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, host: Arc<dyn WorkerHost>) -> Self {
        Self {
            cache,
            network,
            host,
            active: RwLock::new(None),
            last_error: RwLock::new(None),
            updating: Mutex::new(()),
        }
    }

    /// The worker currently serving fetches, if any has activated.
    pub async fn controller(&self) -> Option<OfflineCacheManager> {
        self.active.read().await.as_ref().map(|w| w.manager.clone())
    }

    pub async fn status(&self) -> RegistrationStatus {
        let active = self.active.read().await.as_ref().map(|w| WorkerStatus {
            version: w.manager.version().to_string(),
            state: w.state,
            static_cache: w.manager.settings().static_cache.clone(),
            dynamic_cache: w.manager.settings().dynamic_cache.clone(),
        });
        RegistrationStatus { active, last_error: self.last_error.read().await.clone() }
    }

    /// Put the worker last activated for `scope` back in control.
    ///
    /// Makes no network requests. Returns the resumed version, or `None` when
    /// nothing was recorded or its static partition no longer exists.
    pub async fn restore(&self, scope: &Url) -> Result<Option<String>, Error> {
        let _guard = self.updating.lock().await;
        if let Some(active) = self.active.read().await.as_ref() {
            return Ok(Some(active.manager.version().to_string()));
        }

        let Some(record) = self.cache.load_registration(scope).await? else {
            debug!(%scope, "no recorded worker");
            return Ok(None);
        };
        if !self.cache.has_partition(&record.settings.static_cache).await? {
            warn!(
                version = %record.version,
                cache = %record.settings.static_cache,
                "recorded worker has no static cache; not resuming"
            );
            return Ok(None);
        }

        let manager = OfflineCacheManager::new(
            record.settings,
            self.cache.clone(),
            Arc::clone(&self.network),
            Arc::clone(&self.host),
        );
        self.cache.open_partition(&manager.settings().dynamic_cache).await?;
        self.host.claim_clients(manager.version()).await?;
        info!(version = %record.version, activated_at = %record.activated_at, "resumed recorded worker");

        *self.active.write().await = Some(ActiveWorker { manager, state: WorkerState::Activated });
        Ok(Some(record.version))
    }

    /// Run the update algorithm for `settings`.
    ///
    /// Updates are serialized. On install failure the error is returned and
    /// the previous worker stays in control.
    pub async fn update(&self, settings: CacheSettings) -> Result<UpdateOutcome, Error> {
        let _guard = self.updating.lock().await;

        let version = settings.version();
        if let Some(active) = self.active.read().await.as_ref()
            && active.manager.version() == version
        {
            return Ok(UpdateOutcome::Unchanged);
        }

        let manager =
            OfflineCacheManager::new(settings, self.cache.clone(), Arc::clone(&self.network), Arc::clone(&self.host));
        let mut state = WorkerState::Parsed;

        state.transition(WorkerState::Installing)?;
        if let Err(e) = manager.install().await {
            state.transition(WorkerState::Redundant)?;
            error!(%version, error = %e, "new worker failed to install; keeping current worker");
            *self.last_error.write().await = Some(e.to_string());
            return Err(e);
        }
        state.transition(WorkerState::Installed)?;

        // skip waiting
        state.transition(WorkerState::Activating)?;
        {
            let mut active = self.active.write().await;
            if let Some(mut previous) = active.take() {
                previous.state.transition(WorkerState::Redundant)?;
                info!(version = %previous.manager.version(), "previous worker is redundant");
            }
            *active = Some(ActiveWorker { manager: manager.clone(), state });
        }

        // A failing activate handler does not stop the worker from activating.
        let (deleted, activate_error) = match manager.activate().await {
            Ok(deleted) => (deleted, None),
            Err(e) => {
                warn!(%version, error = %e, "activate handler failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

        if let Some(active) = self.active.write().await.as_mut() {
            active.state.transition(WorkerState::Activated)?;
        }
        *self.last_error.write().await = activate_error;
        if let Err(e) = self.cache.save_registration(manager.settings()).await {
            warn!(%version, error = %e, "failed to record activated worker");
        }
        info!(%version, deleted = deleted.len(), "worker activated");

        Ok(UpdateOutcome::Activated { version, deleted })
    }
}
