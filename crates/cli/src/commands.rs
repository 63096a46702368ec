//! Subcommand implementations. Output goes to `out` so tests can capture it.

use std::io::Write;

use anyhow::{Result, bail};
use url::Url;

use laojobs_client::OfflineCacheManager;
use laojobs_client::fetch::resolve_on_origin;
use laojobs_core::{CacheDb, CacheRequest, Error};

pub async fn install(manager: &OfflineCacheManager, out: &mut impl Write) -> Result<()> {
    manager.install().await?;
    let settings = manager.settings();
    writeln!(out, "installed {} urls into {}", settings.manifest.len(), settings.static_cache)?;
    Ok(())
}

pub async fn activate(manager: &OfflineCacheManager, json: bool, out: &mut impl Write) -> Result<()> {
    let deleted = manager.activate().await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&deleted)?)?;
    } else if deleted.is_empty() {
        writeln!(out, "no stale partitions")?;
    } else {
        for name in &deleted {
            writeln!(out, "deleted {name}")?;
        }
    }
    Ok(())
}

pub async fn partitions(cache: &CacheDb, json: bool, out: &mut impl Write) -> Result<()> {
    let partitions = cache.partitions().await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&partitions)?)?;
        return Ok(());
    }

    writeln!(out, "{:<32} {:>8}  {}", "PARTITION", "ENTRIES", "CREATED")?;
    for p in &partitions {
        writeln!(out, "{:<32} {:>8}  {}", p.name, p.entries, p.created_at)?;
    }
    Ok(())
}

pub async fn entries(cache: &CacheDb, partition: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let Some(handle) = cache.partition(partition).await? else {
        bail!("no partition named {partition}");
    };
    let entries = handle.entries().await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    for e in &entries {
        writeln!(out, "{} {} {}  {}", e.status, e.method, e.url, e.stored_at)?;
    }
    Ok(())
}

/// Look `target` up the way a fetch would, without touching the network.
///
/// A miss fails with [`Error::CacheMiss`].
pub async fn match_url(cache: &CacheDb, origin: &Url, target: &str, body: bool, out: &mut impl Write) -> Result<()> {
    let url = resolve_on_origin(origin, target)?;
    let Some(response) = cache.match_any(&CacheRequest::get(url.clone())).await? else {
        return Err(Error::CacheMiss(format!("GET {url}")).into());
    };

    writeln!(out, "{} {}", response.status, url)?;
    for (name, value) in &response.headers {
        writeln!(out, "{name}: {value}")?;
    }
    if body {
        writeln!(out)?;
        out.write_all(&response.body)?;
        writeln!(out)?;
    } else {
        writeln!(out, "({} bytes)", response.body.len())?;
    }
    Ok(())
}

pub async fn delete(cache: &CacheDb, partition: &str, out: &mut impl Write) -> Result<()> {
    if !cache.delete_partition(partition).await? {
        bail!("no partition named {partition}");
    }
    writeln!(out, "deleted {partition}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use laojobs_client::{LocalHost, Network};
    use laojobs_core::{CacheSettings, StoredResponse};

    struct Static;

    #[async_trait]
    impl Network for Static {
        async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, Error> {
            Ok(StoredResponse::new(200, request.url.path().to_string()).with_header("content-type", "text/plain"))
        }
    }

    fn origin() -> Url {
        Url::parse("https://laojobs.la/").unwrap()
    }

    fn manager(cache: CacheDb) -> OfflineCacheManager {
        let origin = origin();
        let settings = CacheSettings {
            scope: origin.clone(),
            manifest: vec![origin.join("/").unwrap(), origin.join("/offline/").unwrap()],
            static_cache: "laojobs-static-v2".into(),
            dynamic_cache: "laojobs-dynamic-v2".into(),
            excluded_prefixes: vec!["/api/".into()],
            offline_url: origin.join("/offline/").unwrap(),
        };
        OfflineCacheManager::new(settings, cache, Arc::new(Static), Arc::new(LocalHost::new()))
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_install_then_list() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let mut out = Vec::new();
        install(&manager(cache.clone()), &mut out).await.unwrap();
        assert_eq!(text(out), "installed 2 urls into laojobs-static-v2\n");

        let mut out = Vec::new();
        partitions(&cache, false, &mut out).await.unwrap();
        let listing = text(out);
        assert!(listing.lines().nth(1).unwrap().starts_with("laojobs-static-v2"));
        assert!(listing.contains("       2  "));
    }

    #[tokio::test]
    async fn test_activate_reports_deleted() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open_partition("laojobs-static-v1").await.unwrap();

        let mut out = Vec::new();
        activate(&manager(cache.clone()), false, &mut out).await.unwrap();
        assert_eq!(text(out), "deleted laojobs-static-v1\n");

        let mut out = Vec::new();
        activate(&manager(cache), true, &mut out).await.unwrap();
        assert_eq!(text(out).trim(), "[]");
    }

    #[tokio::test]
    async fn test_entries_json() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        install(&manager(cache.clone()), &mut Vec::new()).await.unwrap();

        let mut out = Vec::new();
        entries(&cache, "laojobs-static-v2", true, &mut out).await.unwrap();
        let rows: serde_json::Value = serde_json::from_str(&text(out)).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_entries_unknown_partition() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        assert!(entries(&cache, "nope", false, &mut Vec::new()).await.is_err());
        assert!(!cache.has_partition("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_path_on_origin() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        install(&manager(cache.clone()), &mut Vec::new()).await.unwrap();

        let mut out = Vec::new();
        match_url(&cache, &origin(), "/offline/", true, &mut out).await.unwrap();
        let shown = text(out);
        assert!(shown.starts_with("200 https://laojobs.la/offline/\n"));
        assert!(shown.contains("content-type: text/plain"));
        assert!(shown.ends_with("/offline/\n"));

    }

    #[tokio::test]
    async fn test_match_miss_is_cache_miss() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        install(&manager(cache.clone()), &mut Vec::new()).await.unwrap();

        let mut out = Vec::new();
        let err = match_url(&cache, &origin(), "/jobs/1/", false, &mut out).await.unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(miss @ Error::CacheMiss(_)) => {
                assert_eq!(miss.to_string(), "CACHE_MISS: GET https://laojobs.la/jobs/1/");
                assert_eq!(miss.http_status(), 404);
            }
            other => panic!("expected a cache miss, got {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open_partition("laojobs-static-v1").await.unwrap();

        let mut out = Vec::new();
        delete(&cache, "laojobs-static-v1", &mut out).await.unwrap();
        assert_eq!(text(out), "deleted laojobs-static-v1\n");
        assert!(delete(&cache, "laojobs-static-v1", &mut Vec::new()).await.is_err());
    }
}
