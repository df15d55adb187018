//! Scheduler backed by a tokio runtime's blocking thread pool.

use tokio::runtime::Handle;
use tokio::sync::watch;

use super::{Job, Scheduler, SchedulerError};
use crate::lifecycle::Shutdown;

/// Runs jobs via [`Handle::spawn_blocking`] until shutdown is triggered.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    shutdown: watch::Receiver<bool>,
}

impl TokioScheduler {
    pub fn new(handle: Handle, shutdown: &Shutdown) -> Self {
        Self {
            handle,
            shutdown: shutdown.subscribe(),
        }
    }

    /// Use the runtime the caller is running in.
    pub fn current(shutdown: &Shutdown) -> Result<Self, SchedulerError> {
        let handle = Handle::try_current()
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;
        Ok(Self::new(handle, shutdown))
    }
}

impl Scheduler for TokioScheduler {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        if *self.shutdown.borrow() {
            return Err(SchedulerError::Rejected("runtime is shutting down"));
        }
        // Detached; the guard reports through the connection, not the handle.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
