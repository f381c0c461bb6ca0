//! Test doubles for the worker.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use folio_client::Fetcher;
use folio_core::{AppConfig, CacheRegistry, CacheStorage, Error, MemoryStorage, Request, Response};

use super::background::BackgroundTasks;
use super::strategies::{StrategyContext, WorkerSettings};

#[derive(Default)]
struct Script {
    routes: HashMap<String, Response>,
    holds: HashMap<String, Arc<Notify>>,
    calls: HashMap<String, usize>,
    offline: bool,
}

/// Fetcher answering from a fixed table of URL -> response.
///
/// Unknown URLs and everything after [`go_offline`](Self::go_offline) fail
/// like a dropped connection.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, response: Response) {
        let mut script = self.script.lock().unwrap();
        script.routes.insert(url.to_string(), response);
    }

    pub fn unroute(&self, url: &str) {
        self.script.lock().unwrap().routes.remove(url);
    }

    pub fn go_offline(&self) {
        self.script.lock().unwrap().offline = true;
    }

    /// Park the next fetch of `url` until the returned handle is notified.
    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().unwrap().holds.insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, url: &str) -> usize {
        self.script.lock().unwrap().calls.get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.as_str().to_string();
        let gate = {
            let mut script = self.script.lock().unwrap();
            *script.calls.entry(url.clone()).or_default() += 1;
            script.holds.remove(&url)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let script = self.script.lock().unwrap();
        if script.offline {
            return Err(Error::Network(format!("{url}: offline")));
        }
        script
            .routes
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("{url}: connection refused")))
    }
}

pub fn settings_with_limit(limit: usize) -> WorkerSettings {
    let config = AppConfig { cache_size_limit: limit, ..Default::default() };
    WorkerSettings::from_config(&config).unwrap()
}

pub fn context_on(storage: Arc<dyn CacheStorage>, fetcher: ScriptedFetcher, settings: WorkerSettings) -> StrategyContext {
    StrategyContext {
        registry: CacheRegistry::new(storage, AppConfig::default().version()),
        fetcher: Arc::new(fetcher),
        settings: Arc::new(settings),
        background: BackgroundTasks::new(),
    }
}

pub fn context_with_limit(fetcher: ScriptedFetcher, limit: usize) -> StrategyContext {
    context_on(Arc::new(MemoryStorage::new()), fetcher, settings_with_limit(limit))
}

pub fn context(fetcher: ScriptedFetcher) -> StrategyContext {
    context_with_limit(fetcher, AppConfig::default().cache_size_limit)
}
