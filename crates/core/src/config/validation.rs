//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an http(s) URL
    /// - a partition name is empty, or both names are the same
    /// - `excluded_prefixes` or `offline_path` do not start with `/`
    ///
    /// Returns `ConfigError::Missing` if `manifest` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.static_cache.is_empty() {
            return Err(invalid("static_cache", "must not be empty"));
        }
        if self.dynamic_cache.is_empty() {
            return Err(invalid("dynamic_cache", "must not be empty"));
        }
        if self.static_cache == self.dynamic_cache {
            return Err(invalid("dynamic_cache", "must differ from static_cache"));
        }

        if self.manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "manifest".into(),
                hint: "list the URLs to store at install".into(),
            });
        }

        if let Some(prefix) = self.excluded_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("excluded_prefixes", format!("{prefix:?} must start with '/'")));
        }

        if !self.offline_path.starts_with('/') {
            return Err(invalid("offline_path", "must start with '/'"));
        }

        if !self.manifest.contains(&self.offline_path) {
            tracing::warn!(
                offline_path = %self.offline_path,
                "offline_path is not in the manifest; failed navigations may have no fallback"
            );
        }

        Ok(())
    }
}
