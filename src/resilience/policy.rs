//! Per-connection network timeout configuration.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::net::abort::AbortHandle;
use crate::resilience::watchdog::{OperationScope, OperationWatchdog};
use crate::scheduler::Scheduler;

#[derive(Debug, Default)]
struct PolicyState {
    timeout_ms: u64,
    watchdog: Option<Arc<OperationWatchdog>>,
}

/// Stores the timeout budget and scheduler for one connection and keeps
/// the watchdog attached exactly while the budget is positive.
#[derive(Debug)]
pub struct TimeoutPolicy {
    abort: AbortHandle,
    state: Mutex<PolicyState>,
}

impl TimeoutPolicy {
    pub fn new(abort: AbortHandle) -> Self {
        Self {
            abort,
            state: Mutex::new(PolicyState::default()),
        }
    }

    /// Set the budget for each monitored operation.
    ///
    /// `0` disables monitoring; a guard already armed for an operation in
    /// flight is left for that operation to cancel. A positive budget needs a
    /// scheduler. Invalid arguments leave the previous configuration intact.
    pub fn configure(&self, millis: i64, scheduler: Option<Arc<dyn Scheduler>>) -> Result<()> {
        let millis = u64::try_from(millis)
            .map_err(|_| Error::InvalidArgument(format!("Invalid timeout ({millis}<0).")))?;

        if millis == 0 {
            let mut state = self.state();
            if let Some(watchdog) = state.watchdog.take() {
                watchdog.update(Duration::ZERO, None);
            }
            state.timeout_ms = 0;
            tracing::debug!(connection_id = %self.abort.connection_id(), "Network timeout disabled");
            return Ok(());
        }

        let scheduler = scheduler.ok_or_else(|| {
            Error::InvalidArgument("Scheduler must be set when timeout is positive".to_string())
        })?;
        let timeout = Duration::from_millis(millis);

        let mut state = self.state();
        match &state.watchdog {
            Some(watchdog) => watchdog.update(timeout, Some(scheduler)),
            None => {
                state.watchdog = Some(Arc::new(OperationWatchdog::new(
                    self.abort.clone(),
                    timeout,
                    scheduler,
                )));
            }
        }
        state.timeout_ms = millis;

        tracing::debug!(
            connection_id = %self.abort.connection_id(),
            timeout_ms = millis,
            "Network timeout configured"
        );
        Ok(())
    }

    /// The last configured budget in milliseconds; 0 when disabled.
    pub fn timeout_millis(&self) -> u64 {
        self.state().timeout_ms
    }

    /// The attached watchdog, present iff the budget is positive.
    pub fn watchdog(&self) -> Option<Arc<OperationWatchdog>> {
        self.state().watchdog.clone()
    }

    /// Open a scope around one blocking network operation.
    pub fn begin_operation(&self) -> OperationScope {
        match self.watchdog() {
            Some(watchdog) => watchdog.begin(),
            None => OperationScope::unmonitored(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PolicyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
