//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LAOJOBS_SW_*)
//! 2. TOML config file (if LAOJOBS_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::policy::CacheSettings;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LAOJOBS_SW_*)
/// 2. TOML config file (if LAOJOBS_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker fronts; relative manifest entries resolve against it.
    ///
    /// Set via LAOJOBS_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the proxy host listens on.
    ///
    /// Set via LAOJOBS_SW_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via LAOJOBS_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via LAOJOBS_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via LAOJOBS_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via LAOJOBS_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Versioned name of the static partition.
    ///
    /// Set via LAOJOBS_SW_STATIC_CACHE environment variable.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Versioned name of the dynamic partition.
    ///
    /// Set via LAOJOBS_SW_DYNAMIC_CACHE environment variable.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// URLs stored in the static partition at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path prefixes that are never cached.
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,

    /// Offline fallback page path.
    ///
    /// Set via LAOJOBS_SW_OFFLINE_PATH environment variable.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./laojobs-offline.sqlite")
}

fn default_user_agent() -> String {
    "laojobs-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_cache() -> String {
    "laojobs-static-v1".into()
}

fn default_dynamic_cache() -> String {
    "laojobs-dynamic-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec![
        "/".into(),
        "/static/css/main.css".into(),
        "/static/js/main.js".into(),
        "/static/manifest.json".into(),
        "/offline/".into(),
        "https://fonts.googleapis.com/css2?family=Noto+Sans+Lao:wght@300;400;500;600;700;800&display=swap".into(),
    ]
}

fn default_excluded_prefixes() -> Vec<String> {
    vec!["/api/".into(), "/admin/".into()]
}

fn default_offline_path() -> String {
    "/offline/".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            static_cache: default_static_cache(),
            dynamic_cache: default_dynamic_cache(),
            manifest: default_manifest(),
            excluded_prefixes: default_excluded_prefixes(),
            offline_path: default_offline_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LAOJOBS_SW_`
    /// 2. TOML file from `LAOJOBS_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LAOJOBS_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("LAOJOBS_SW_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Parsed origin URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Build the immutable settings record handed to the cache manager.
    ///
    /// Relative manifest entries and the offline path are resolved against
    /// the origin.
    pub fn cache_settings(&self) -> Result<CacheSettings, ConfigError> {
        let origin = self.origin_url()?;
        let resolve = |field: &str, raw: &str| {
            origin
                .join(raw)
                .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{raw}: {e}") })
        };

        let manifest = self
            .manifest
            .iter()
            .map(|entry| resolve("manifest", entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CacheSettings {
            scope: origin.clone(),
            manifest,
            static_cache: self.static_cache.clone(),
            dynamic_cache: self.dynamic_cache.clone(),
            excluded_prefixes: self.excluded_prefixes.clone(),
            offline_url: resolve("offline_path", &self.offline_path)?,
        })
    }
}
