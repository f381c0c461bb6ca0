//! Cache writes that outlive the response they were issued for.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Tracks spawned background work so it can be awaited later.
///
/// Tasks keep running if nobody waits on them.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Wait until every task, including ones spawned while waiting, is done.
    pub async fn drain(&self) {
        loop {
            let mut pending = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background task failed");
                }
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
