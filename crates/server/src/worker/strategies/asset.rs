//! Stale-while-revalidate for scripts, styles and fonts.

use folio_core::{CacheRole, Request, Response};

use super::StrategyContext;

/// Serve the cached copy at once while the network refreshes the dynamic
/// bucket behind it. Without a cached copy the caller waits for the network.
pub async fn handle(ctx: &StrategyContext, request: &Request) -> Response {
    let cached = ctx.cached_in(CacheRole::Dynamic, request).await;
    let refresh = revalidate(ctx.clone(), request.clone());

    match cached {
        Some(stale) => {
            ctx.background.spawn(async move {
                refresh.await;
            });
            stale
        }
        None => refresh.await,
    }
}

async fn revalidate(ctx: StrategyContext, request: Request) -> Response {
    match ctx.fetcher.fetch(&request).await {
        Ok(response) => {
            ctx.store_logged(CacheRole::Dynamic, &request, &response).await;
            response
        }
        Err(e) => {
            tracing::error!(url = %request.url, error = %e, "asset fetch failed");
            Response::not_found()
        }
    }
}
