//! Cache first for images.

use folio_core::{CacheRole, Request, Response};

use super::StrategyContext;

/// Serve a cached image without touching the network, else fetch, store
/// and trim. A failed fetch becomes an empty 404.
pub async fn handle(ctx: &StrategyContext, request: &Request) -> Response {
    if let Some(cached) = ctx.cached(request).await {
        return cached;
    }

    match ctx.fetcher.fetch(request).await {
        Ok(response) => {
            ctx.store_logged(CacheRole::Images, request, &response).await;
            response
        }
        Err(e) => {
            tracing::error!(url = %request.url, error = %e, "image fetch failed");
            Response::not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{ScriptedFetcher, context, context_with_limit};
    use folio_core::Destination;

    fn image(name: &str) -> Request {
        Request::get(url::Url::parse(&format!("http://localhost:8080/img/{name}")).unwrap())
            .with_destination(Destination::Image)
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve("http://localhost:8080/img/me.webp", Response::new(200, "webp"));
        let ctx = context(fetcher.clone());

        let first = handle(&ctx, &image("me.webp")).await;
        let second = handle(&ctx, &image("me.webp")).await;

        assert_eq!(first, second);
        assert_eq!(fetcher.calls("http://localhost:8080/img/me.webp"), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_404() {
        let fetcher = ScriptedFetcher::new();
        fetcher.go_offline();
        let ctx = context(fetcher);

        let resp = handle(&ctx, &image("missing.png")).await;
        assert_eq!(resp.status, 404);
        assert!(resp.body.is_empty());
        assert_eq!(ctx.registry.bucket(CacheRole::Images).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bucket_stays_within_bound() {
        let fetcher = ScriptedFetcher::new();
        for i in 0..8 {
            fetcher.serve(&format!("http://localhost:8080/img/{i}.png"), Response::new(200, format!("{i}")));
        }
        let ctx = context_with_limit(fetcher, 3);

        for i in 0..8 {
            handle(&ctx, &image(&format!("{i}.png"))).await;
            assert!(ctx.registry.bucket(CacheRole::Images).count().await.unwrap() <= 3);
        }

        let keys = ctx.registry.bucket(CacheRole::Images).keys().await.unwrap();
        assert_eq!(keys.last().unwrap().url, "http://localhost:8080/img/7.png");
    }
}
