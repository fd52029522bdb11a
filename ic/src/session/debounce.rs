//! Debounced task scheduling
//!
//! Each `schedule` cancels the pending task and starts a fresh quiet
//! interval, so a burst of changes results in one run of the last task.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Holds at most one pending delayed task
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the quiet interval, replacing any pending one
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let previous = self.pending.lock().unwrap_or_else(PoisonError::into_inner).replace(handle);
        if let Some(previous) = previous {
            debug!("Debouncer::schedule: rescheduling, aborting pending task");
            previous.abort();
        }
    }

    /// Abort the pending task, if any
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            debug!("Debouncer::cancel: aborting pending task");
            handle.abort();
        }
    }

    /// True while a scheduled task has not yet finished
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
