//! Offline cache manager: install, activate and fetch handling.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use laojobs_core::{Bypass, CacheDb, CacheRequest, CacheSettings, Error, Route, StoredResponse, route};

use super::event::ExtendableEvent;
use super::host::WorkerHost;
use super::push::{ClickDecision, Notification, PushPayload, resolve_click};
use super::sync;
use crate::fetch::Network;

/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
}

/// Result of a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker did not intercept; the host goes to the network itself.
    NotHandled(Bypass),
    /// The worker answered.
    Response { response: StoredResponse, source: ResponseSource },
}

impl FetchOutcome {
    fn respond(response: StoredResponse, source: ResponseSource) -> Self {
        FetchOutcome::Response { response, source }
    }
}

/// One deployed worker version.
///
/// Cheap to clone: settings, network and host are shared and `CacheDb`
/// clones share one connection.
#[derive(Clone)]
pub struct OfflineCacheManager {
    settings: Arc<CacheSettings>,
    cache: CacheDb,
    network: Arc<dyn Network>,
    host: Arc<dyn WorkerHost>,
    version: String,
}

impl std::fmt::Debug for OfflineCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCacheManager")
            .field("version", &self.version)
            .field("static_cache", &self.settings.static_cache)
            .field("dynamic_cache", &self.settings.dynamic_cache)
            .finish_non_exhaustive()
    }
}

impl OfflineCacheManager {
    pub fn new(
        settings: CacheSettings, cache: CacheDb, network: Arc<dyn Network>, host: Arc<dyn WorkerHost>,
    ) -> Self {
        let version = settings.version();
        Self { settings: Arc::new(settings), cache, network, host, version }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Classify a request without side effects.
    pub fn route(&self, request: &CacheRequest) -> Route {
        route(&self.settings, request)
    }

    /// Populate the static partition with every manifest URL.
    ///
    /// All URLs are fetched before anything is written; one failure (no
    /// response, or a status other than 200) aborts the install. The
    /// partition is created in the same transaction as its entries, so a
    /// failed install leaves no trace of the new version.
    pub async fn install(&self) -> Result<(), Error> {
        info!(
            cache = %self.settings.static_cache,
            urls = self.settings.manifest.len(),
            "caching static files"
        );

        let mut fetches = JoinSet::new();
        for (idx, url) in self.settings.manifest.iter().enumerate() {
            let network = Arc::clone(&self.network);
            let request = CacheRequest::get(url.clone());
            fetches.spawn(async move {
                let result = network.fetch(&request).await;
                (idx, request, result)
            });
        }

        let mut fetched = Vec::with_capacity(self.settings.manifest.len());
        while let Some(joined) = fetches.join_next().await {
            let (idx, request, result) = joined.map_err(|e| Error::InstallFailed {
                url: "<manifest>".into(),
                reason: format!("fetch task failed: {e}"),
            })?;
            let response = match result {
                Ok(response) if response.is_cacheable() => response,
                Ok(response) => {
                    return Err(self.install_failed(&request, format!("status {}", response.status)));
                }
                Err(e) => return Err(self.install_failed(&request, e.to_string())),
            };
            fetched.push((idx, request, response));
        }

        fetched.sort_by_key(|(idx, _, _)| *idx);
        let pairs: Vec<(CacheRequest, StoredResponse)> =
            fetched.into_iter().map(|(_, request, response)| (request, response)).collect();

        self.cache.populate(&self.settings.static_cache, &pairs).await?;
        info!(cache = %self.settings.static_cache, entries = pairs.len(), "static files cached");
        Ok(())
    }

    fn install_failed(&self, request: &CacheRequest, reason: String) -> Error {
        error!(url = %request.url, %reason, "install failed");
        Error::InstallFailed { url: request.url.to_string(), reason }
    }

    /// Delete partitions that belong to other versions, open this version's
    /// dynamic partition, then claim clients.
    ///
    /// Returns the names deleted. Running it again deletes nothing.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.cache.partition_names().await? {
            if self.settings.is_current_partition(&name) {
                continue;
            }
            if self.cache.delete_partition(&name).await? {
                info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }

        self.cache.open_partition(&self.settings.dynamic_cache).await?;

        let claimed = self.host.claim_clients(&self.version).await?;
        debug!(version = %self.version, claimed, "activated");
        Ok(deleted)
    }

    /// Handle one fetch event.
    ///
    /// Cache writes are attached to `event` and may still be running when
    /// this returns.
    pub async fn handle_fetch(
        &self, request: &CacheRequest, event: &mut ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        let route = self.route(request);
        debug!(method = %request.method, url = %request.url, strategy = route.strategy(), "fetch");

        match route {
            Route::Passthrough(bypass) => Ok(FetchOutcome::NotHandled(bypass)),
            Route::NetworkFirst { cache_name } => self.network_first(request, &cache_name, event).await,
            Route::CacheFirst { cache_name } => self.cache_first(request, &cache_name, event).await,
        }
    }

    async fn network_first(
        &self, request: &CacheRequest, cache_name: &str, event: &mut ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_partial() {
                    debug!(url = %request.url, status = response.status, "not caching partial response");
                } else {
                    self.store_in_background(event, cache_name, request.clone(), response.clone());
                }
                Ok(FetchOutcome::respond(response, ResponseSource::Network))
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "network failed, falling back to cache");
                if let Some(cached) = self.lookup(request).await {
                    return Ok(FetchOutcome::respond(cached, ResponseSource::Cache));
                }
                let offline = CacheRequest::get(self.settings.offline_url.clone());
                if let Some(page) = self.lookup(&offline).await {
                    return Ok(FetchOutcome::respond(page, ResponseSource::OfflineFallback));
                }
                Err(Error::OfflineUnavailable(request.url.to_string()))
            }
        }
    }

    async fn cache_first(
        &self, request: &CacheRequest, cache_name: &str, event: &mut ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.lookup(request).await {
            return Ok(FetchOutcome::respond(cached, ResponseSource::Cache));
        }

        let response = self.network.fetch(request).await?;
        if response.is_cacheable() {
            self.store_in_background(event, cache_name, request.clone(), response.clone());
        } else {
            debug!(url = %request.url, status = response.status, "not caching unsuccessful response");
        }
        Ok(FetchOutcome::respond(response, ResponseSource::Network))
    }

    /// Cross-partition lookup; a store error counts as a miss.
    async fn lookup(&self, request: &CacheRequest) -> Option<StoredResponse> {
        match self.cache.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write `response` once the fetch has been answered. A failed write is
    /// logged and never reaches the client.
    fn store_in_background(
        &self, event: &mut ExtendableEvent, cache_name: &str, request: CacheRequest, response: StoredResponse,
    ) {
        let cache = self.cache.clone();
        let cache_name = cache_name.to_string();
        event.wait_until(async move {
            match store(&cache, &cache_name, &request, &response).await {
                Ok(true) => {}
                Ok(false) => debug!(cache = %cache_name, url = %request.url, "partition retired, response not stored"),
                Err(e) => warn!(cache = %cache_name, url = %request.url, error = %e, "failed to store response"),
            }
        });
    }

    /// Handle a push message. An empty push shows nothing.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Option<Notification>, Error> {
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            debug!("push without data ignored");
            return Ok(None);
        };
        let notification = Notification::from_payload(PushPayload::parse(data)?);
        self.host.show_notification(&notification).await?;
        Ok(Some(notification))
    }

    /// Handle a click on a notification (`action` is `None` for a body click).
    pub async fn handle_notification_click(
        &self, notification: &Notification, action: Option<&str>,
    ) -> Result<ClickDecision, Error> {
        debug!(title = %notification.title, action = action.unwrap_or(""), "notification clicked");
        self.host.close_notification(notification).await?;
        let target = self.settings.resolve(&notification.data.url)?;
        let windows = self.host.window_clients().await?;

        let decision = resolve_click(action, &target, &windows);
        match &decision {
            ClickDecision::Focus(id) => self.host.focus(id).await?,
            ClickDecision::Open(url) => {
                self.host.open_window(url).await?;
            }
            ClickDecision::Dismiss => {}
        }
        Ok(decision)
    }

    /// Handle a background-sync event.
    pub async fn handle_sync(&self, tag: &str) -> Result<bool, Error> {
        sync::handle_sync(tag).await
    }
}

/// Store into `cache_name` only while it exists. A partition deleted by a
/// newer version's activation stays deleted; returns false in that case.
async fn store(
    cache: &CacheDb, cache_name: &str, request: &CacheRequest, response: &StoredResponse,
) -> Result<bool, Error> {
    let Some(partition) = cache.partition(cache_name).await? else {
        return Ok(false);
    };
    partition.put(request, response).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::host::LocalHost;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Network double answering from a fixed table; unknown URLs fail.
    #[derive(Default)]
    struct ScriptedNetwork {
        responses: Mutex<HashMap<String, StoredResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedNetwork {
        fn with(self, path: &str, response: StoredResponse) -> Self {
            self.responses.lock().unwrap().insert(abs(path).to_string(), response);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
        }
    }

    fn abs(path: &str) -> Url {
        Url::parse("https://laojobs.la/").unwrap().join(path).unwrap()
    }

    fn settings() -> CacheSettings {
        CacheSettings {
            scope: abs("/"),
            manifest: vec![abs("/"), abs("/static/css/main.css"), abs("/offline/")],
            static_cache: "static-v1".into(),
            dynamic_cache: "dynamic-v1".into(),
            excluded_prefixes: vec!["/api/".into(), "/admin/".into()],
            offline_url: abs("/offline/"),
        }
    }

    async fn manager(network: ScriptedNetwork) -> (OfflineCacheManager, Arc<ScriptedNetwork>, Arc<LocalHost>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(network);
        let host = Arc::new(LocalHost::new());
        let mgr = OfflineCacheManager::new(settings(), db, network.clone(), host.clone());
        (mgr, network, host)
    }

    fn page(body: &str) -> StoredResponse {
        StoredResponse::new(200, body).with_header("content-type", "text/html")
    }

    fn full_site() -> ScriptedNetwork {
        ScriptedNetwork::default()
            .with("/", page("home"))
            .with("/static/css/main.css", StoredResponse::new(200, "body{}"))
            .with("/offline/", page("offline"))
    }

    fn body(outcome: &FetchOutcome) -> (&[u8], ResponseSource) {
        match outcome {
            FetchOutcome::Response { response, source } => (response.body.as_slice(), *source),
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_install_caches_manifest() {
        let (mgr, _, _) = manager(full_site()).await;
        mgr.install().await.unwrap();

        let part = mgr.cache().open_partition("static-v1").await.unwrap();
        for url in &mgr.settings().manifest {
            let hit = part.match_request(&CacheRequest::get(url.clone())).await.unwrap();
            assert!(hit.is_some(), "{url} missing after install");
        }
    }

    #[tokio::test]
    async fn test_install_fails_atomically() {
        let network = ScriptedNetwork::default()
            .with("/", page("home"))
            .with("/offline/", page("offline"));
        let (mgr, _, _) = manager(network).await;

        let err = mgr.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { ref url, .. } if url.ends_with("/static/css/main.css")));

        assert!(!mgr.cache().has_partition("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let network = full_site().with("/static/css/main.css", StoredResponse::new(404, "missing"));
        let (mgr, _, _) = manager(network).await;
        let err = mgr.install().await.unwrap_err();
        assert!(err.to_string().contains("status 404"));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_partitions() {
        let (mgr, _, host) = manager(full_site()).await;
        let db = mgr.cache();
        db.open_partition("static-v1").await.unwrap();
        db.open_partition("dynamic-v1").await.unwrap();
        db.open_partition("static-v0").await.unwrap();
        host.record_navigation(&abs("/")).await;

        let deleted = mgr.activate().await.unwrap();
        assert_eq!(deleted, vec!["static-v0"]);
        assert_eq!(db.partition_names().await.unwrap(), vec!["static-v1", "dynamic-v1"]);
        assert_eq!(host.controller().await.as_deref(), Some(mgr.version()));

        assert!(mgr.activate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_opens_dynamic_partition() {
        let (mgr, _, _) = manager(full_site()).await;
        mgr.install().await.unwrap();
        mgr.activate().await.unwrap();
        assert_eq!(mgr.cache().partition_names().await.unwrap(), vec!["static-v1", "dynamic-v1"]);
    }

    #[tokio::test]
    async fn test_non_get_not_handled() {
        let (mgr, network, _) = manager(full_site()).await;
        let mut event = ExtendableEvent::new();
        let req = CacheRequest::new("POST", abs("/jobs/42/apply/"));

        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotHandled(Bypass::Method));
        assert_eq!(network.calls(), 0);
        assert_eq!(event.pending(), 0);
    }

    #[tokio::test]
    async fn test_api_not_handled_even_when_cached() {
        let (mgr, network, _) = manager(full_site()).await;
        let req = CacheRequest::get(abs("/api/jobs/?page=2"));
        mgr.cache()
            .open_partition("dynamic-v1")
            .await
            .unwrap()
            .put(&req, &StoredResponse::new(200, "[]"))
            .await
            .unwrap();

        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::NotHandled(Bypass::ExcludedPrefix(_))));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_network_first_returns_live_and_stores() {
        let network = full_site().with("/jobs/42/", page("job 42"));
        let (mgr, _, _) = manager(network).await;
        mgr.activate().await.unwrap();
        let req = CacheRequest::navigation(abs("/jobs/42/"));

        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        assert_eq!(body(&outcome), (&b"job 42"[..], ResponseSource::Network));

        event.settled().await;
        let stored = mgr.cache().match_any(&req).await.unwrap().unwrap();
        assert_eq!(stored.body, b"job 42");
    }

    #[tokio::test]
    async fn test_network_first_does_not_store_not_modified() {
        let network = full_site().with("/jobs/42/", StoredResponse::new(304, "").with_header("etag", "\"j42\""));
        let (mgr, network, _) = manager(network).await;
        mgr.install().await.unwrap();
        mgr.activate().await.unwrap();
        let req = CacheRequest::navigation(abs("/jobs/42/")).with_header("if-none-match", "\"j42\"");

        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        match &outcome {
            FetchOutcome::Response { response, source } => {
                assert_eq!(response.status, 304);
                assert_eq!(*source, ResponseSource::Network);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(event.pending(), 0);
        assert!(mgr.cache().match_any(&req).await.unwrap().is_none());

        network.responses.lock().unwrap().clear();
        let offline = mgr.handle_fetch(&CacheRequest::navigation(abs("/jobs/42/")), &mut ExtendableEvent::new()).await;
        assert_eq!(body(&offline.unwrap()), (&b"offline"[..], ResponseSource::OfflineFallback));
    }

    #[tokio::test]
    async fn test_network_first_does_not_store_partial_content() {
        let network = ScriptedNetwork::default().with("/jobs/", StoredResponse::new(206, "<ht"));
        let (mgr, _, _) = manager(network).await;
        mgr.activate().await.unwrap();
        let req = CacheRequest::navigation(abs("/jobs/")).with_header("range", "bytes=0-2");

        let mut event = ExtendableEvent::new();
        mgr.handle_fetch(&req, &mut event).await.unwrap();
        event.settled().await;
        assert!(mgr.cache().match_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_store_does_not_fail_request() {
        let network = ScriptedNetwork::default()
            .with("/jobs/42/", page("job 42"))
            .with("/static/img/logo.png", StoredResponse::new(200, "png"));
        let (mgr, _, _) = manager(network).await;
        mgr.activate().await.unwrap();
        mgr.cache().clone().close().await.unwrap();

        let req = CacheRequest::navigation(abs("/jobs/42/"));
        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        assert_eq!(body(&outcome), (&b"job 42"[..], ResponseSource::Network));
        assert_eq!(event.pending(), 1);
        event.settled().await;

        let asset = CacheRequest::get(abs("/static/img/logo.png"));
        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&asset, &mut event).await.unwrap();
        assert_eq!(body(&outcome), (&b"png"[..], ResponseSource::Network));
        event.settled().await;

        assert!(store(mgr.cache(), "dynamic-v1", &req, &page("job 42")).await.is_err());
    }

    #[tokio::test]
    async fn test_store_skips_retired_partition() {
        let (mgr, _, _) = manager(ScriptedNetwork::default()).await;
        let db = mgr.cache();
        let req = CacheRequest::navigation(abs("/jobs/3/"));

        assert!(!store(db, "dynamic-v0", &req, &page("job 3")).await.unwrap());
        assert!(!db.has_partition("dynamic-v0").await.unwrap());

        db.open_partition("dynamic-v1").await.unwrap();
        assert!(store(db, "dynamic-v1", &req, &page("job 3")).await.unwrap());
    }

    #[tokio::test]
    async fn test_superseded_worker_does_not_recreate_its_partition() {
        let network = Arc::new(full_site().with("/jobs/5/", page("job 5")));
        let db = CacheDb::open_in_memory().await.unwrap();
        let host = Arc::new(LocalHost::new());
        let old = OfflineCacheManager::new(settings(), db.clone(), network.clone(), host.clone());
        old.install().await.unwrap();
        old.activate().await.unwrap();

        let next = CacheSettings { static_cache: "static-v2".into(), dynamic_cache: "dynamic-v2".into(), ..settings() };
        let new = OfflineCacheManager::new(next, db.clone(), network, host);
        new.install().await.unwrap();
        new.activate().await.unwrap();

        // A request that started under the old worker finishes after the swap.
        let req = CacheRequest::navigation(abs("/jobs/5/"));
        let mut event = ExtendableEvent::new();
        let outcome = old.handle_fetch(&req, &mut event).await.unwrap();
        assert_eq!(body(&outcome), (&b"job 5"[..], ResponseSource::Network));
        event.settled().await;

        assert_eq!(db.partition_names().await.unwrap(), vec!["static-v2", "dynamic-v2"]);
        assert!(db.match_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (mgr, _, _) = manager(ScriptedNetwork::default()).await;
        let req = CacheRequest::navigation(abs("/jobs/7/"));
        mgr.cache()
            .open_partition("dynamic-v1")
            .await
            .unwrap()
            .put(&req, &page("cached job 7"))
            .await
            .unwrap();

        let outcome = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await.unwrap();
        assert_eq!(body(&outcome), (&b"cached job 7"[..], ResponseSource::Cache));
    }

    #[tokio::test]
    async fn test_network_first_offline_fallback() {
        let (mgr, network, _) = manager(full_site()).await;
        mgr.install().await.unwrap();
        network.responses.lock().unwrap().clear();

        let req = CacheRequest::navigation(abs("/jobs/42/"));
        let outcome = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await.unwrap();
        assert_eq!(body(&outcome), (&b"offline"[..], ResponseSource::OfflineFallback));
    }

    #[tokio::test]
    async fn test_network_first_without_offline_page() {
        let (mgr, _, _) = manager(ScriptedNetwork::default()).await;
        let req = CacheRequest::navigation(abs("/jobs/42/"));
        let result = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await;
        assert!(matches!(result, Err(Error::OfflineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let (mgr, network, _) = manager(full_site()).await;
        let req = CacheRequest::get(abs("/static/css/main.css"));
        mgr.cache()
            .open_partition("dynamic-v1")
            .await
            .unwrap()
            .put(&req, &StoredResponse::new(200, "cached css"))
            .await
            .unwrap();

        let outcome = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await.unwrap();
        assert_eq!(body(&outcome), (&b"cached css"[..], ResponseSource::Cache));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_stores_success() {
        let network = ScriptedNetwork::default().with("/static/img/logo.png", StoredResponse::new(200, "png"));
        let (mgr, network, _) = manager(network).await;
        mgr.activate().await.unwrap();
        let req = CacheRequest::get(abs("/static/img/logo.png"));

        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        assert_eq!(body(&outcome), (&b"png"[..], ResponseSource::Network));
        event.settled().await;

        let again = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await.unwrap();
        assert_eq!(body(&again).1, ResponseSource::Cache);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let network = ScriptedNetwork::default().with("/static/missing.js", StoredResponse::new(404, "nope"));
        let (mgr, _, _) = manager(network).await;
        let req = CacheRequest::get(abs("/static/missing.js"));

        let mut event = ExtendableEvent::new();
        let outcome = mgr.handle_fetch(&req, &mut event).await.unwrap();
        match outcome {
            FetchOutcome::Response { response, .. } => assert_eq!(response.status, 404),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(event.pending(), 0);
        assert!(mgr.cache().match_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_propagates() {
        let (mgr, _, _) = manager(ScriptedNetwork::default()).await;
        let req = CacheRequest::get(abs("/static/js/main.js"));
        let result = mgr.handle_fetch(&req, &mut ExtendableEvent::new()).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_push_and_click_opens_then_focuses() {
        let (mgr, _, host) = manager(ScriptedNetwork::default()).await;
        let notification = mgr
            .handle_push(Some(br#"{"title":"New job","body":"Driver","url":"/jobs/9/"}"#))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(host.notifications().await.len(), 1);

        let first = mgr.handle_notification_click(&notification, None).await.unwrap();
        assert_eq!(first, ClickDecision::Open(abs("/jobs/9/")));

        assert!(host.notifications().await.is_empty());

        let second = mgr.handle_notification_click(&notification, Some("view")).await.unwrap();
        assert!(matches!(second, ClickDecision::Focus(_)));
        assert_eq!(host.window_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_action_dismisses_notification() {
        let (mgr, _, host) = manager(ScriptedNetwork::default()).await;
        let notification = mgr
            .handle_push(Some(br#"{"title":"New job","body":"Cook"}"#))
            .await
            .unwrap()
            .unwrap();

        let decision = mgr.handle_notification_click(&notification, Some("close")).await.unwrap();
        assert_eq!(decision, ClickDecision::Dismiss);
        assert!(host.notifications().await.is_empty());
        assert!(host.window_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_push_ignored() {
        let (mgr, _, host) = manager(ScriptedNetwork::default()).await;
        assert!(mgr.handle_push(None).await.unwrap().is_none());
        assert!(mgr.handle_push(Some(b"")).await.unwrap().is_none());
        assert!(host.notifications().await.is_empty());
    }
}
