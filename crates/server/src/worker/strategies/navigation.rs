//! Network first for page navigations.
//!
//! Preload response, then live network, then any cached copy, then the
//! offline page. Successful responses are copied into the static bucket in
//! the background.

use folio_core::{CacheRole, Error, Request, Response};

use super::StrategyContext;

/// Navigation preload as delivered with the fetch event.
#[derive(Debug, Clone, Default)]
pub enum Preload {
    /// Preload disabled or nothing was started for this request.
    #[default]
    None,
    Ready(Response),
    /// The preload request itself failed.
    Failed(String),
}

/// Returns `None` only when every fallback is exhausted.
pub async fn handle(ctx: &StrategyContext, request: &Request, preload: Preload) -> Option<Response> {
    let live = match preload {
        Preload::Ready(response) => {
            tracing::debug!(url = %request.url, "using preload response");
            Ok(response)
        }
        Preload::Failed(reason) => Err(Error::Network(format!("preload failed: {reason}"))),
        Preload::None => ctx.fetcher.fetch(request).await,
    };

    match live {
        Ok(response) => {
            ctx.store_in_background(CacheRole::Static, request.clone(), response.clone());
            return Some(response);
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "navigation network failed, trying cache");
        }
    }

    if let Some(cached) = ctx.cached(request).await {
        return Some(cached);
    }

    let offline = Request::get(ctx.settings.offline_page.clone());
    let page = ctx.cached(&offline).await;
    if page.is_none() {
        tracing::error!(url = %request.url, "navigation failed with no offline page cached");
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{ScriptedFetcher, context};
    use folio_core::CacheRole;

    fn page(path: &str) -> Request {
        Request::navigate(url::Url::parse("http://localhost:8080").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_network_response_is_stored() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve("http://localhost:8080/about", Response::new(200, "about v1"));
        let ctx = context(fetcher.clone());

        let resp = handle(&ctx, &page("/about"), Preload::None).await.unwrap();
        assert_eq!(resp.body, "about v1");

        ctx.background.drain().await;
        let stored = ctx.registry.bucket(CacheRole::Static).match_request(&page("/about")).await.unwrap();
        assert_eq!(stored.unwrap().body, "about v1");
    }

    #[tokio::test]
    async fn test_preload_skips_network() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone());

        let resp = handle(&ctx, &page("/"), Preload::Ready(Response::new(200, "preloaded"))).await.unwrap();
        assert_eq!(resp.body, "preloaded");
        assert_eq!(fetcher.calls("http://localhost:8080/"), 0);

        ctx.background.drain().await;
        assert_eq!(ctx.registry.bucket(CacheRole::Static).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_preload_falls_back_to_cache() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve("http://localhost:8080/", Response::new(200, "fresh"));
        let ctx = context(fetcher.clone());
        ctx.registry
            .bucket(CacheRole::Static)
            .put(&page("/"), &Response::new(200, "cached"))
            .await
            .unwrap();

        let resp = handle(&ctx, &page("/"), Preload::Failed("aborted".into())).await.unwrap();
        assert_eq!(resp.body, "cached");
        assert_eq!(fetcher.calls("http://localhost:8080/"), 0);
    }

    #[tokio::test]
    async fn test_offline_page_when_uncached() {
        let fetcher = ScriptedFetcher::new();
        fetcher.go_offline();
        let ctx = context(fetcher);
        ctx.registry
            .bucket(CacheRole::Static)
            .put(&Request::get(ctx.settings.offline_page.clone()), &Response::new(200, "offline"))
            .await
            .unwrap();

        let resp = handle(&ctx, &page("/projects"), Preload::None).await.unwrap();
        assert_eq!(resp.body, "offline");
    }

    #[tokio::test]
    async fn test_total_exhaustion_yields_nothing() {
        let fetcher = ScriptedFetcher::new();
        fetcher.go_offline();
        let ctx = context(fetcher);

        assert!(handle(&ctx, &page("/projects"), Preload::None).await.is_none());
    }
}
