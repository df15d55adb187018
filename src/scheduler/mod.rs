//! Work-submission resources that run timeout guards.
//!
//! # Data Flow
//! ```text
//! OperationWatchdog::on_operation_start
//!     → Scheduler::execute(guard job)
//!         → inline.rs  (runs on the calling thread)
//!         → pool.rs    (fixed set of OS worker threads)
//!         → runtime.rs (tokio blocking pool, gated by lifecycle::Shutdown)
//!     → Err(Rejected) when the resource no longer accepts work
//! ```
//!
//! # Design Decisions
//! - One scheduler may be shared by any number of connections
//! - Jobs are opaque `FnOnce` closures; schedulers know nothing about guards
//! - Rejection is an ordinary return value, never a panic

pub mod inline;
pub mod pool;
pub mod runtime;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{SchedulerConfig, SchedulerKind};
use crate::lifecycle::Shutdown;

pub use inline::InlineScheduler;
pub use pool::WorkerPool;
pub use runtime::TokioScheduler;

/// A unit of work submitted to a scheduler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors produced by schedulers.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler refused the job, typically because it is shutting down.
    #[error("Job rejected: {0}")]
    Rejected(&'static str),

    /// The scheduler could not be constructed.
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

/// An opaque handle that executes submitted jobs, possibly asynchronously.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Submit `job` for execution.
    fn execute(&self, job: Job) -> Result<(), SchedulerError>;
}

/// Build the scheduler described by `config`.
///
/// The tokio flavor must be called from within a runtime.
pub fn build_scheduler(
    config: &SchedulerConfig,
    shutdown: &Shutdown,
) -> Result<Arc<dyn Scheduler>, SchedulerError> {
    let scheduler: Arc<dyn Scheduler> = match config.kind {
        SchedulerKind::Inline => Arc::new(InlineScheduler),
        SchedulerKind::Pool => Arc::new(
            WorkerPool::new(config.worker_threads)
                .map_err(|e| SchedulerError::Unavailable(e.to_string()))?,
        ),
        SchedulerKind::Tokio => Arc::new(TokioScheduler::current(shutdown)?),
    };

    tracing::debug!(kind = ?config.kind, worker_threads = config.worker_threads, "Scheduler built");
    Ok(scheduler)
}
