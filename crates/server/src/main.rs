//! folio-sw entry point.
//!
//! Boots the caching worker behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use folio_client::{FetchClient, FetchConfig, Fetcher};
use folio_core::{AppConfig, CacheDb, CacheStorage, MemoryStorage};

mod error;
mod handler;
mod tools;
mod worker;

use worker::ServiceWorker;
use worker::host::{LocalHost, WorkerHost};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache_version, "Starting folio-sw on stdio transport");

    let storage: Arc<dyn CacheStorage> = if config.in_memory {
        Arc::new(MemoryStorage::new())
    } else {
        tracing::info!(path = %config.db_path.display(), "opening bucket store");
        Arc::new(CacheDb::open(&config.db_path).await?)
    };

    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let host: Arc<dyn WorkerHost> = Arc::new(LocalHost::new(true));
    let worker = Arc::new(ServiceWorker::new(storage, Arc::clone(&fetcher), host, &config)?);

    let handler = handler::FolioWorkerServer::new(Arc::clone(&worker), fetcher);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    worker.idle().await;

    Ok(())
}
