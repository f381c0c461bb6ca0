//! Install / activate lifecycle.
//!
//! ```text
//! Parsed -> Installing -> Waiting -> Activating -> Active
//!               \
//!                +-> Redundant (install failed)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;

use folio_core::{CacheRegistry, CacheRole, Error, Request, Response};

use super::host::{PreloadStatus, WorkerHost};
use super::strategies::StrategyContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed; a previous worker may still control clients.
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Active)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Control messages accepted from pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
}

impl ControlMessage {
    /// Recognizes `{"type": "SKIP_WAITING"}`; anything else is `None`.
    pub fn parse(data: &Value) -> Option<Self> {
        match data.get("type").and_then(Value::as_str) {
            Some("SKIP_WAITING") => Some(Self::SkipWaiting),
            _ => None,
        }
    }
}

/// State plus the skip-waiting flag.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { state: Mutex::new(WorkerState::Parsed), skip_waiting: AtomicBool::new(false) }
    }
}

impl Lifecycle {
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    /// Move `from` -> `to`, failing if the current state is not `from`.
    pub fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !from.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot enter {to} from {}", *state)));
        }
        let previous = *state;
        *state = to;
        tracing::info!(from = %previous, to = %to, "worker state changed");
        Ok(previous)
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub bucket: String,
    pub stored: Vec<String>,
}

/// Outcome of activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub navigation_preload: bool,
    pub deleted: Vec<String>,
    pub claimed_clients: usize,
}

/// Fetch every manifest URL and store them into the static bucket as one
/// batch. Any failed or non-OK fetch aborts the whole install and nothing is
/// written.
pub async fn precache(ctx: &StrategyContext) -> Result<InstallReport, Error> {
    let manifest = &ctx.settings.precache_manifest;
    tracing::info!(entries = manifest.len(), "caching static assets");

    let mut fetches = JoinSet::new();
    for (idx, url) in manifest.iter().enumerate() {
        let fetcher = ctx.fetcher.clone();
        let request = Request::get(url.clone());
        fetches.spawn(async move {
            let result = fetcher.fetch(&request).await;
            (idx, request, result)
        });
    }

    let mut entries: Vec<Option<(Request, Response)>> = vec![None; manifest.len()];
    while let Some(joined) = fetches.join_next().await {
        let (idx, request, result) = joined.map_err(|e| Error::InvalidState(format!("precache task failed: {e}")))?;
        let url = request.url.to_string();
        match result {
            Ok(response) if response.is_ok() => entries[idx] = Some((request, response)),
            Ok(response) => {
                return Err(Error::PrecacheFailed { url, reason: format!("status {}", response.status) });
            }
            Err(e) => return Err(Error::PrecacheFailed { url, reason: e.to_string() }),
        }
    }

    let entries: Vec<(Request, Response)> = entries.into_iter().flatten().collect();
    let bucket = ctx.registry.bucket(CacheRole::Static);
    bucket.put_all(&entries).await?;

    Ok(InstallReport {
        bucket: bucket.name().to_string(),
        stored: entries.iter().map(|(request, _)| request.url.to_string()).collect(),
    })
}

/// Enable preload, drop every bucket the current version does not own, then
/// claim clients. Each step logs its own failure and activation goes on.
pub async fn activate(registry: &CacheRegistry, host: &dyn WorkerHost) -> ActivateReport {
    let (navigation_preload, deleted) = tokio::join!(enable_preload(host), delete_stale_buckets(registry));

    let claimed_clients = match host.claim_clients().await {
        Ok(claimed) => claimed,
        Err(e) => {
            tracing::error!(error = %e, "failed to claim clients");
            0
        }
    };

    ActivateReport { navigation_preload, deleted, claimed_clients }
}

async fn enable_preload(host: &dyn WorkerHost) -> bool {
    match host.enable_navigation_preload().await {
        Ok(PreloadStatus::Enabled) => {
            tracing::info!("navigation preload enabled");
            true
        }
        Ok(PreloadStatus::Unsupported) => {
            tracing::info!("navigation preload not supported");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to enable navigation preload");
            false
        }
    }
}

async fn delete_stale_buckets(registry: &CacheRegistry) -> Vec<String> {
    let stale = match registry.stale_names().await {
        Ok(stale) => stale,
        Err(e) => {
            tracing::error!(error = %e, "failed to enumerate buckets");
            return Vec::new();
        }
    };

    let mut deleted = Vec::with_capacity(stale.len());
    for name in stale {
        match registry.delete_bucket(&name).await {
            Ok(_) => {
                tracing::info!(bucket = %name, "deleted old bucket");
                deleted.push(name);
            }
            Err(e) => tracing::error!(bucket = %name, error = %e, "failed to delete old bucket"),
        }
    }
    deleted
}
