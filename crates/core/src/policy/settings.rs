//! Immutable per-deploy cache settings.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::fingerprint;

/// Everything that identifies one deployed worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Origin the worker controls; relative URLs resolve against it.
    pub scope: Url,
    /// Absolute URLs stored in the static partition at install, in order.
    pub manifest: Vec<Url>,
    /// Versioned name of the static partition.
    pub static_cache: String,
    /// Versioned name of the dynamic partition.
    pub dynamic_cache: String,
    /// Path prefixes that always bypass the cache (case-sensitive).
    pub excluded_prefixes: Vec<String>,
    /// Page served when a navigation fails and nothing is cached for it.
    pub offline_url: Url,
}

impl CacheSettings {
    /// The partition names the current version keeps on activate.
    pub fn current_partitions(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.dynamic_cache.as_str()]
    }

    pub fn is_current_partition(&self, name: &str) -> bool {
        self.current_partitions().contains(&name)
    }

    /// The excluded prefix `path` falls under, if any.
    pub fn excluded_prefix(&self, path: &str) -> Option<&str> {
        self.excluded_prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| path.starts_with(*prefix))
    }

    /// Resolve a path or absolute URL against the scope.
    pub fn resolve(&self, target: &str) -> Result<Url, crate::Error> {
        self.scope
            .join(target)
            .map_err(|e| crate::Error::InvalidUrl(format!("{target}: {e}")))
    }

    /// Stable fingerprint of the settings; a change means a new deploy.
    pub fn version(&self) -> String {
        let mut parts: Vec<&str> = vec![
            self.scope.as_str(),
            self.static_cache.as_str(),
            self.dynamic_cache.as_str(),
            self.offline_url.as_str(),
        ];
        parts.extend(self.excluded_prefixes.iter().map(String::as_str));
        parts.extend(self.manifest.iter().map(Url::as_str));
        fingerprint(parts)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> CacheSettings {
        let origin = Url::parse("https://laojobs.la/").unwrap();
        CacheSettings {
            scope: origin.clone(),
            manifest: ["/", "/static/css/main.css", "/offline/"]
                .iter()
                .map(|p| origin.join(p).unwrap())
                .collect(),
            static_cache: "laojobs-static-v1".into(),
            dynamic_cache: "laojobs-dynamic-v1".into(),
            excluded_prefixes: vec!["/api/".into(), "/admin/".into()],
            offline_url: origin.join("/offline/").unwrap(),
        }
    }

    #[test]
    fn test_current_partitions() {
        let settings = sample();
        assert!(settings.is_current_partition("laojobs-static-v1"));
        assert!(settings.is_current_partition("laojobs-dynamic-v1"));
        assert!(!settings.is_current_partition("laojobs-static-v0"));
        assert!(!settings.is_current_partition("laojobs-v1"));
    }

    #[test]
    fn test_excluded_path_is_case_sensitive() {
        let settings = sample();
        assert_eq!(settings.excluded_prefix("/api/jobs/"), Some("/api/"));
        assert_eq!(settings.excluded_prefix("/admin/"), Some("/admin/"));
        assert_eq!(settings.excluded_prefix("/API/jobs/"), None);
        assert_eq!(settings.excluded_prefix("/apiary/"), None);
    }

    #[test]
    fn test_resolve() {
        let settings = sample();
        assert_eq!(settings.resolve("/jobs/42/").unwrap().as_str(), "https://laojobs.la/jobs/42/");
        assert_eq!(settings.resolve("https://other.la/x").unwrap().as_str(), "https://other.la/x");
    }

    #[test]
    fn test_version_changes_with_partition_name() {
        let v1 = sample();
        let v2 = CacheSettings { static_cache: "laojobs-static-v2".into(), ..sample() };
        assert_eq!(v1.version(), sample().version());
        assert_ne!(v1.version(), v2.version());
    }
}
