//! Fetch strategies.
//!
//! Every strategy resolves to a response or, for navigations only, to
//! nothing at all. Cache reads and writes never fail a request: storage
//! errors are logged and the strategy carries on as if the cache missed.

pub mod asset;
pub mod image;
pub mod navigation;

use std::sync::Arc;

use folio_client::Fetcher;
use folio_core::cache::{EvictionMode, trim};
use folio_core::url::normalize;
use folio_core::{AppConfig, CacheRegistry, CacheRole, Error, Request, Response};
use url::Url;

use super::background::BackgroundTasks;

/// Resolved settings the strategies and lifecycle read.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub origin: Url,
    pub font_cdn: Url,
    pub offline_page: Url,
    pub precache_manifest: Vec<Url>,
    pub cache_size_limit: usize,
    pub eviction: EvictionMode,
    pub skip_waiting_on_install: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let font_cdn = config.font_cdn().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let resolve = |input: &str| normalize(input, &origin).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")));

        let offline_page = resolve(&config.offline_page)?;
        let precache_manifest = config
            .precache_manifest
            .iter()
            .map(|entry| resolve(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            font_cdn,
            offline_page,
            precache_manifest,
            cache_size_limit: config.cache_size_limit,
            eviction: config.eviction,
            skip_waiting_on_install: config.skip_waiting_on_install,
            origin,
        })
    }
}

/// Everything a strategy needs. Cheap to clone into background tasks.
#[derive(Clone)]
pub struct StrategyContext {
    pub registry: CacheRegistry,
    pub fetcher: Arc<dyn Fetcher>,
    pub settings: Arc<WorkerSettings>,
    pub background: BackgroundTasks,
}

impl StrategyContext {
    /// Registry-wide lookup; storage errors count as a miss.
    pub(crate) async fn cached(&self, request: &Request) -> Option<Response> {
        match self.registry.match_request(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// The role's current bucket first, then registry-wide.
    ///
    /// Copies refreshed into `role` win over older ones elsewhere, such as
    /// the precached static copy of the same URL.
    pub(crate) async fn cached_in(&self, role: CacheRole, request: &Request) -> Option<Response> {
        match self.registry.bucket(role).match_request(request).await {
            Ok(Some(hit)) => return Some(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(bucket = %role, url = %request.url, error = %e, "cache lookup failed"),
        }
        self.cached(request).await
    }

    /// Store a copy into the role's current bucket, trimming bounded roles.
    ///
    /// Returns how many entries eviction removed.
    pub(crate) async fn store(&self, role: CacheRole, request: &Request, response: &Response) -> Result<usize, Error> {
        if !response.is_cacheable() {
            tracing::debug!(url = %request.url, status = response.status, "response not cacheable");
            return Ok(0);
        }

        let bucket = self.registry.bucket(role);
        bucket.put(request, response).await?;

        if role.is_bounded() {
            return trim(&bucket, self.settings.cache_size_limit, self.settings.eviction).await;
        }
        Ok(0)
    }

    /// [`store`](Self::store), logging instead of failing.
    pub(crate) async fn store_logged(&self, role: CacheRole, request: &Request, response: &Response) {
        if let Err(e) = self.store(role, request, response).await {
            tracing::warn!(bucket = %role, url = %request.url, error = %e, "cache write failed");
        }
    }

    /// Store without holding up the caller.
    pub(crate) fn store_in_background(&self, role: CacheRole, request: Request, response: Response) {
        let ctx = self.clone();
        self.background.spawn(async move {
            ctx.store_logged(role, &request, &response).await;
        });
    }
}
