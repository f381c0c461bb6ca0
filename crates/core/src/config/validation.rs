//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::url::normalize;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` is empty or contains whitespace
    /// - `cache_size_limit` is 0
    /// - `precache_manifest` is empty or lacks `offline_page`
    /// - `site_origin` or `font_cdn_origin` is not an absolute URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.is_empty() || self.cache_version.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "cache_version".into(),
                reason: "must be non-empty without whitespace".into(),
            });
        }

        if self.cache_size_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_size_limit".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.precache_manifest.is_empty() {
            return Err(ConfigError::Invalid { field: "precache_manifest".into(), reason: "must not be empty".into() });
        }

        let origin = self.origin()?;
        self.font_cdn()?;

        let resolve = |field: &str, input: &str| {
            normalize(input, &origin)
                .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{input}: {e}") })
        };
        let offline_page = resolve("offline_page", &self.offline_page)?;
        let mut precached = false;
        for entry in &self.precache_manifest {
            precached |= resolve("precache_manifest", entry)? == offline_page;
        }
        if !precached {
            return Err(ConfigError::Invalid {
                field: "offline_page".into(),
                reason: format!("{} is not in precache_manifest", self.offline_page),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.in_memory {
            tracing::warn!("in_memory is set; buckets will not survive a restart");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_version_whitespace() {
        let config = AppConfig { cache_version: "1.0 beta".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("cache_version"));
    }

    #[test]
    fn test_validate_zero_bound() {
        let config = AppConfig { cache_size_limit: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("cache_size_limit"));
    }

    #[test]
    fn test_validate_offline_page_not_precached() {
        let config = AppConfig { precache_manifest: vec!["/".into(), "/index.html".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("offline_page"));
    }

    #[test]
    fn test_validate_offline_page_matches_absolute_entry() {
        let config = AppConfig {
            precache_manifest: vec!["/".into(), "http://LOCALHOST:8080/offline.html#top".into()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unparseable_manifest_entry() {
        let config = AppConfig {
            precache_manifest: vec!["/offline.html".into(), "ftp://localhost/file".into()],
            ..Default::default()
        };
        assert_eq!(invalid_field(&config).as_deref(), Some("precache_manifest"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { precache_manifest: Vec::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("precache_manifest"));
    }

    #[test]
    fn test_validate_bad_font_cdn() {
        let config = AppConfig { font_cdn_origin: "gstatic".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("font_cdn_origin"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let low = AppConfig { timeout_ms: 50, ..Default::default() };
        let high = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(invalid_field(&low).as_deref(), Some("timeout_ms"));
        assert_eq!(invalid_field(&high).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let zero = AppConfig { max_bytes: 0, ..Default::default() };
        let big = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(invalid_field(&zero).as_deref(), Some("max_bytes"));
        assert_eq!(invalid_field(&big).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { cache_size_limit: 1, max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
