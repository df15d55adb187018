//! Scheduler that runs each job on the submitting thread.

use super::{Job, Scheduler, SchedulerError};

/// Runs jobs synchronously; `execute` returns once the job has finished.
///
/// Useful for tests and for fire-and-forget calls where the caller wants
/// completion before returning. Not suitable for timeout guards with a
/// positive budget: the guard would block the I/O thread for the whole wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        job();
        Ok(())
    }
}
