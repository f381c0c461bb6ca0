//! Capabilities the hosting runtime grants the worker.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use folio_core::Error;

/// Result of asking the host to enable navigation preload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStatus {
    Enabled,
    Unsupported,
}

/// Registration-level operations owned by the host.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    async fn enable_navigation_preload(&self) -> Result<PreloadStatus, Error>;

    /// Take control of already-open clients. Returns how many were claimed.
    async fn claim_clients(&self) -> Result<usize, Error>;

    /// Whether clients controlled by a previous worker are still open.
    async fn has_legacy_clients(&self) -> bool;
}

/// Process-local host used by the stdio server.
#[derive(Debug)]
pub struct LocalHost {
    preload_supported: bool,
    preload_enabled: AtomicBool,
    open_clients: AtomicUsize,
    legacy_clients: AtomicUsize,
}

impl LocalHost {
    pub fn new(preload_supported: bool) -> Self {
        Self {
            preload_supported,
            preload_enabled: AtomicBool::new(false),
            open_clients: AtomicUsize::new(1),
            legacy_clients: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub fn navigation_preload_enabled(&self) -> bool {
        self.preload_enabled.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn set_legacy_clients(&self, count: usize) {
        self.legacy_clients.store(count, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn set_open_clients(&self, count: usize) {
        self.open_clients.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkerHost for LocalHost {
    async fn enable_navigation_preload(&self) -> Result<PreloadStatus, Error> {
        if !self.preload_supported {
            return Ok(PreloadStatus::Unsupported);
        }
        self.preload_enabled.store(true, Ordering::SeqCst);
        Ok(PreloadStatus::Enabled)
    }

    async fn claim_clients(&self) -> Result<usize, Error> {
        self.legacy_clients.store(0, Ordering::SeqCst);
        Ok(self.open_clients.load(Ordering::SeqCst))
    }

    async fn has_legacy_clients(&self) -> bool {
        self.legacy_clients.load(Ordering::SeqCst) > 0
    }
}
