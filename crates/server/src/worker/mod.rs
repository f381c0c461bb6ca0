//! The caching worker.
//!
//! [`ServiceWorker`] owns one handler per event kind (install, activate,
//! fetch, message). The host delivers events by calling them; nothing here
//! listens on globals.

pub mod background;
pub mod host;
pub mod lifecycle;
pub mod router;
pub mod strategies;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde_json::Value;

use folio_client::Fetcher;
use folio_core::{AppConfig, CacheRegistry, CacheStorage, Error, Request, Response};

use background::BackgroundTasks;
use host::WorkerHost;
use lifecycle::{ActivateReport, ControlMessage, InstallReport, Lifecycle, WorkerState};
use router::Route;
use strategies::navigation::Preload;
use strategies::{StrategyContext, WorkerSettings};

/// One intercepted request.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
    pub preload: Preload,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, preload: Preload::None }
    }

    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }
}

/// What the fetch handler did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker answered.
    Respond { route: Route, response: Response },
    /// The worker abstained; the platform fetches normally.
    Passthrough(Route),
    /// A navigation with nothing left to serve.
    NetworkError,
}

/// What a message turned into.
#[derive(Debug, Clone)]
pub enum MessageOutcome {
    Ignored,
    SkipWaiting { activated: Option<ActivateReport> },
}

pub struct ServiceWorker {
    ctx: StrategyContext,
    host: Arc<dyn WorkerHost>,
    lifecycle: Lifecycle,
}

impl ServiceWorker {
    pub fn new(
        storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, host: Arc<dyn WorkerHost>, config: &AppConfig,
    ) -> Result<Self, Error> {
        let settings = WorkerSettings::from_config(config)?;
        let ctx = StrategyContext {
            registry: CacheRegistry::new(storage, config.version()),
            fetcher,
            settings: Arc::new(settings),
            background: BackgroundTasks::new(),
        };
        Ok(Self { ctx, host, lifecycle: Lifecycle::default() })
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.ctx.registry
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.ctx.settings
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.skip_waiting_requested()
    }

    pub fn pending_background_tasks(&self) -> usize {
        self.ctx.background.pending()
    }

    /// Precache the manifest. A failure leaves the worker redundant.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.transition(&[WorkerState::Parsed], WorkerState::Installing)?;

        match lifecycle::precache(&self.ctx).await {
            Ok(report) => {
                self.lifecycle.transition(&[WorkerState::Installing], WorkerState::Waiting)?;
                if self.ctx.settings.skip_waiting_on_install {
                    self.lifecycle.skip_waiting();
                }
                tracing::info!(bucket = %report.bucket, stored = report.stored.len(), "install complete");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to cache static assets during install");
                self.lifecycle.transition(&[WorkerState::Installing], WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    /// Activate once skip-waiting was requested or no legacy clients remain.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        if self.state() != WorkerState::Waiting {
            return Err(Error::InvalidState(format!("cannot activate from {}", self.state())));
        }
        if !self.lifecycle.skip_waiting_requested() && self.host.has_legacy_clients().await {
            return Err(Error::InvalidState("waiting for clients of the previous worker to close".into()));
        }

        self.lifecycle.transition(&[WorkerState::Waiting], WorkerState::Activating)?;
        let report = lifecycle::activate(&self.ctx.registry, self.host.as_ref()).await;
        self.lifecycle.transition(&[WorkerState::Activating], WorkerState::Active)?;
        Ok(report)
    }

    /// Handle a page message. Only `{"type": "SKIP_WAITING"}` does anything.
    pub async fn on_message(&self, data: &Value) -> Result<MessageOutcome, Error> {
        let Some(ControlMessage::SkipWaiting) = ControlMessage::parse(data) else {
            tracing::debug!("ignoring unrecognized message");
            return Ok(MessageOutcome::Ignored);
        };

        tracing::info!("received SKIP_WAITING message");
        self.lifecycle.skip_waiting();

        let activated = if self.state() == WorkerState::Waiting { Some(self.on_activate().await?) } else { None };
        Ok(MessageOutcome::SkipWaiting { activated })
    }

    /// Route one request to its strategy, or abstain.
    pub async fn on_fetch(&self, event: FetchEvent) -> FetchOutcome {
        let route = router::route(&event.request, &self.ctx.settings.font_cdn);
        if !self.state().can_intercept_fetch() {
            return FetchOutcome::Passthrough(route);
        }

        let response = match route {
            Route::Navigation => strategies::navigation::handle(&self.ctx, &event.request, event.preload).await,
            Route::Image => Some(strategies::image::handle(&self.ctx, &event.request).await),
            Route::Asset => Some(strategies::asset::handle(&self.ctx, &event.request).await),
            Route::Excluded | Route::Unmatched => return FetchOutcome::Passthrough(route),
        };
        tracing::debug!(url = %event.request.url, route = route.as_str(), "intercepted");

        match response {
            Some(response) => FetchOutcome::Respond { route, response },
            None => FetchOutcome::NetworkError,
        }
    }

    /// Wait for outstanding background cache writes.
    pub async fn idle(&self) {
        self.ctx.background.drain().await;
    }
}
