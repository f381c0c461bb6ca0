//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_SW_*)
//! 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{EvictionMode, VersionTag};

mod validation;

pub use validation::ConfigError;

/// Version tag of the current deployment.
pub const CACHE_VERSION: &str = "1.0.1";

/// Maximum entries in the dynamic and images buckets.
pub const CACHE_SIZE_LIMIT: usize = 50;

/// URLs stored into the static bucket at install time.
pub const PRECACHE_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/assets/style/styles.css",
    "/assets/js/script.js",
    "/assets/favicon/favicon.ico",
    "/site.webmanifest",
    "https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&display=swap",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_SW_*)
/// 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite bucket store.
    ///
    /// Set via FOLIO_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Keep buckets in memory only; nothing survives a restart.
    #[serde(default)]
    pub in_memory: bool,

    /// Deployment version used in every bucket name.
    ///
    /// Set via FOLIO_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Entry bound for the dynamic and images buckets.
    #[serde(default = "default_cache_size_limit")]
    pub cache_size_limit: usize,

    /// Eviction mode for bounded buckets: "oldest" or "sweep".
    #[serde(default)]
    pub eviction: EvictionMode,

    /// URLs fetched into the static bucket on install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Skip the waiting state as soon as install succeeds.
    ///
    /// When false, activation waits for legacy clients to close or for a
    /// SKIP_WAITING message.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Page served to navigations when both network and cache miss.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Origin that root-relative URLs resolve against.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    /// Webfont CDN whose requests use stale-while-revalidate.
    #[serde(default = "default_font_cdn_origin")]
    pub font_cdn_origin: String,

    /// User-Agent string for network fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./folio-sw-cache.sqlite")
}

fn default_cache_version() -> String {
    CACHE_VERSION.into()
}

fn default_cache_size_limit() -> usize {
    CACHE_SIZE_LIMIT
}

fn default_precache_manifest() -> Vec<String> {
    PRECACHE_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_site_origin() -> String {
    "http://localhost:8080".into()
}

fn default_font_cdn_origin() -> String {
    "https://fonts.gstatic.com".into()
}

fn default_user_agent() -> String {
    "folio-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            in_memory: false,
            cache_version: default_cache_version(),
            cache_size_limit: default_cache_size_limit(),
            eviction: EvictionMode::default(),
            precache_manifest: default_precache_manifest(),
            skip_waiting_on_install: true,
            offline_page: default_offline_page(),
            site_origin: default_site_origin(),
            font_cdn_origin: default_font_cdn_origin(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn version(&self) -> VersionTag {
        VersionTag::new(self.cache_version.clone())
    }

    /// Parsed site origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `site_origin` is not an absolute URL.
    pub fn origin(&self) -> Result<Url, ConfigError> {
        parse_origin("site_origin", &self.site_origin)
    }

    /// Parsed webfont CDN origin.
    pub fn font_cdn(&self) -> Result<Url, ConfigError> {
        parse_origin("font_cdn_origin", &self.font_cdn_origin)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_SW_`
    /// 2. TOML file from `FOLIO_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("FOLIO_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("FOLIO_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

fn parse_origin(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be an absolute origin".into() });
    }
    Ok(url)
}
