//! Per-connection operation watchdog.
//!
//! The transport layer brackets every blocking network call with
//! [`OperationWatchdog::on_operation_start`] and
//! [`OperationWatchdog::on_operation_end`], normally through an
//! [`OperationScope`] so the end notification also happens on error paths.

use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::net::abort::AbortHandle;
use crate::observability::metrics;
use crate::resilience::timeouts::{GuardSlot, TimeoutGuard};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone)]
struct WatchSettings {
    timeout: Duration,
    scheduler: Option<Arc<dyn Scheduler>>,
}

/// Arms a fresh [`TimeoutGuard`] when an operation starts and disarms it
/// when the operation ends.
#[derive(Debug)]
pub struct OperationWatchdog {
    settings: Mutex<WatchSettings>,
    slot: Arc<GuardSlot>,
    abort: AbortHandle,
}

impl OperationWatchdog {
    pub(crate) fn new(abort: AbortHandle, timeout: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            settings: Mutex::new(WatchSettings {
                timeout,
                scheduler: Some(scheduler),
            }),
            slot: Arc::new(GuardSlot::new()),
            abort,
        }
    }

    /// Replace the budget and scheduler used for future operations.
    pub(crate) fn update(&self, timeout: Duration, scheduler: Option<Arc<dyn Scheduler>>) {
        let mut settings = self.settings();
        settings.timeout = timeout;
        settings.scheduler = scheduler;
    }

    /// Whether the next operation would be monitored.
    pub fn is_monitoring(&self) -> bool {
        let settings = self.settings();
        !settings.timeout.is_zero() && settings.scheduler.is_some()
    }

    /// The guard armed for the operation in flight, if any.
    pub fn active_guard(&self) -> Option<Arc<TimeoutGuard>> {
        self.slot.current()
    }

    /// Arm a guard for the operation about to start and hand it to the
    /// scheduler.
    ///
    /// A rejected submission is absorbed: monitoring is switched off for this
    /// connection until the timeout is configured again.
    pub fn on_operation_start(&self) {
        let (timeout, scheduler) = {
            let settings = self.settings();
            match &settings.scheduler {
                Some(scheduler) if !settings.timeout.is_zero() => {
                    (settings.timeout, Arc::clone(scheduler))
                }
                _ => return,
            }
        };

        let guard = Arc::new(TimeoutGuard::new(
            timeout,
            self.abort.clone(),
            Arc::downgrade(&self.slot),
        ));
        if let Some(stale) = self.slot.replace(Arc::clone(&guard)) {
            if stale.cancel() {
                tracing::debug!(
                    connection_id = %self.abort.connection_id(),
                    "Operation started with a guard still armed; cancelled it"
                );
            }
        }

        let job = Arc::clone(&guard);
        match scheduler.execute(Box::new(move || {
            job.run();
        })) {
            Ok(()) => {
                tracing::trace!(
                    connection_id = %self.abort.connection_id(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Timeout guard armed"
                );
                metrics::record_guard_armed();
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.abort.connection_id(),
                    error = %e,
                    "Scheduler rejected timeout guard; network timeout monitoring disabled"
                );
                metrics::record_submission_rejected();
                guard.cancel();

                let mut settings = self.settings();
                let same = settings
                    .scheduler
                    .as_ref()
                    .is_some_and(|current| ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(&scheduler)));
                if same {
                    settings.scheduler = None;
                }
            }
        }
    }

    /// Disarm the current guard. A no-op when none is armed.
    pub fn on_operation_end(&self) {
        let Some(guard) = self.slot.take() else {
            return;
        };
        if guard.cancel() {
            tracing::trace!(connection_id = %self.abort.connection_id(), "Timeout guard cancelled");
            metrics::record_guard_cancelled();
        }
    }

    /// Start a monitored operation; it ends when the returned scope drops.
    pub fn begin(self: &Arc<Self>) -> OperationScope {
        self.on_operation_start();
        OperationScope {
            watchdog: Some(Arc::clone(self)),
        }
    }

    fn settings(&self) -> std::sync::MutexGuard<'_, WatchSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks one monitored operation. Dropping it ends the operation.
#[must_use = "dropping the scope ends the monitored operation immediately"]
#[derive(Debug)]
pub struct OperationScope {
    watchdog: Option<Arc<OperationWatchdog>>,
}

impl OperationScope {
    /// A scope for an operation nobody is watching.
    pub(crate) fn unmonitored() -> Self {
        Self { watchdog: None }
    }

    pub fn is_monitored(&self) -> bool {
        self.watchdog.is_some()
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.on_operation_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use crate::net::transport::CountingTransport;
    use crate::resilience::timeouts::GuardState;
    use crate::scheduler::{Job, SchedulerError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds jobs without running them.
    #[derive(Default)]
    struct Parking {
        jobs: Mutex<Vec<Job>>,
    }

    impl std::fmt::Debug for Parking {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Parking").finish_non_exhaustive()
        }
    }

    impl Scheduler for Parking {
        fn execute(&self, job: Job) -> Result<(), SchedulerError> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Rejecting {
        attempts: AtomicUsize,
    }

    impl Scheduler for Rejecting {
        fn execute(&self, _job: Job) -> Result<(), SchedulerError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SchedulerError::Rejected("closed"))
        }
    }

    fn make_watchdog(scheduler: Arc<dyn Scheduler>) -> (Arc<OperationWatchdog>, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::default());
        let abort = AbortHandle::new(ConnectionId::new(), transport.clone());
        let watchdog = OperationWatchdog::new(abort, Duration::from_millis(50), scheduler);
        (Arc::new(watchdog), transport)
    }

    #[test]
    fn start_arms_and_end_cancels() {
        let parking = Arc::new(Parking::default());
        let (watchdog, transport) = make_watchdog(parking.clone());

        watchdog.on_operation_start();
        let guard = watchdog.active_guard().unwrap();
        assert_eq!(guard.timeout(), Duration::from_millis(50));
        assert_eq!(parking.jobs.lock().unwrap().len(), 1);

        watchdog.on_operation_end();
        assert!(watchdog.active_guard().is_none());
        assert_eq!(guard.state(), GuardState::Cancelled);

        // The parked job runs late and must not fire.
        for job in parking.jobs.lock().unwrap().drain(..) {
            job();
        }
        assert_eq!(transport.count(), 0);
    }

    #[test]
    fn end_without_start_is_noop() {
        let (watchdog, _) = make_watchdog(Arc::new(Parking::default()));
        watchdog.on_operation_end();
        watchdog.on_operation_start();
        watchdog.on_operation_end();
        watchdog.on_operation_end();
        assert!(watchdog.active_guard().is_none());
    }

    #[test]
    fn second_start_supersedes_first_guard() {
        let parking = Arc::new(Parking::default());
        let (watchdog, transport) = make_watchdog(parking.clone());

        watchdog.on_operation_start();
        let first = watchdog.active_guard().unwrap();
        watchdog.on_operation_start();
        let second = watchdog.active_guard().unwrap();

        assert_eq!(first.state(), GuardState::Cancelled);
        assert_eq!(second.state(), GuardState::Armed);

        assert_eq!(first.run(), GuardState::Cancelled);
        assert_eq!(transport.count(), 0);
    }

    #[test]
    fn rejection_disables_monitoring_until_reconfigured() {
        let rejecting = Arc::new(Rejecting::default());
        let (watchdog, transport) = make_watchdog(rejecting.clone());

        watchdog.on_operation_start();
        assert!(!watchdog.is_monitoring());
        watchdog.on_operation_end();

        watchdog.on_operation_start();
        watchdog.on_operation_end();
        assert_eq!(rejecting.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(transport.count(), 0);

        let parking = Arc::new(Parking::default());
        watchdog.update(Duration::from_millis(50), Some(parking.clone() as Arc<dyn Scheduler>));
        assert!(watchdog.is_monitoring());
        watchdog.on_operation_start();
        assert_eq!(parking.jobs.lock().unwrap().len(), 1);
    }

    #[test]
    fn scope_ends_operation_on_drop() {
        let (watchdog, _) = make_watchdog(Arc::new(Parking::default()));
        {
            let scope = watchdog.begin();
            assert!(scope.is_monitored());
            assert!(watchdog.active_guard().is_some());
        }
        assert!(watchdog.active_guard().is_none());
    }

    #[test]
    fn zero_timeout_creates_no_guard() {
        let parking = Arc::new(Parking::default());
        let (watchdog, _) = make_watchdog(parking.clone());
        watchdog.update(Duration::ZERO, Some(parking.clone() as Arc<dyn Scheduler>));

        watchdog.on_operation_start();
        assert!(watchdog.active_guard().is_none());
        assert!(parking.jobs.lock().unwrap().is_empty());
    }
}
