//! Timeout guards.
//!
//! A [`TimeoutGuard`] is a single-use task: "abort this connection after the
//! budget elapses unless cancelled first". It is created when a monitored
//! operation starts and runs on a scheduler thread.
//!
//! # State Transitions
//! ```text
//! Armed → Cancelled   cancel(), or superseded by a newer guard
//! Armed → Fired       budget elapsed while still the connection's current guard
//! ```

use std::ptr;
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use crate::net::abort::AbortHandle;
use crate::observability::metrics::{self, AbortReason};

/// Lifecycle of a guard. `Cancelled` and `Fired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Armed,
    Cancelled,
    Fired,
}

/// A cancellable, single-shot abort scheduled for one monitored operation.
#[derive(Debug)]
pub struct TimeoutGuard {
    timeout: Duration,
    created_at: Instant,
    state: Mutex<GuardState>,
    wakeup: Condvar,
    abort: AbortHandle,
    slot: Weak<GuardSlot>,
}

impl TimeoutGuard {
    pub(crate) fn new(timeout: Duration, abort: AbortHandle, slot: Weak<GuardSlot>) -> Self {
        Self {
            timeout,
            created_at: Instant::now(),
            state: Mutex::new(GuardState::Armed),
            wakeup: Condvar::new(),
            abort,
            slot,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> GuardState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait out the remaining budget, then abort the connection if the guard
    /// is still armed and still the connection's current guard.
    ///
    /// Time spent queued on the scheduler counts against the budget; if none
    /// is left the fire check happens immediately. Returns the terminal state.
    pub fn run(&self) -> GuardState {
        let remaining = self.timeout.saturating_sub(self.created_at.elapsed());

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !remaining.is_zero() {
            let (guard, _) = self
                .wakeup
                .wait_timeout_while(state, remaining, |s| *s == GuardState::Armed)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }

        if *state != GuardState::Armed {
            return *state;
        }

        if !self.is_current() {
            tracing::trace!(
                connection_id = %self.abort.connection_id(),
                "Stale timeout guard expired without firing"
            );
            *state = GuardState::Cancelled;
            return GuardState::Cancelled;
        }

        *state = GuardState::Fired;
        drop(state);

        tracing::warn!(
            connection_id = %self.abort.connection_id(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Network timeout exceeded"
        );
        metrics::record_timeout_fired();
        self.abort.abort(AbortReason::Timeout);
        GuardState::Fired
    }

    /// Disarm the guard and wake a waiting [`run`](Self::run).
    ///
    /// Returns `true` if this call prevented the guard from firing, `false`
    /// if it had already fired or been cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != GuardState::Armed {
            return false;
        }
        *state = GuardState::Cancelled;
        self.wakeup.notify_all();
        true
    }

    fn is_current(&self) -> bool {
        self.slot
            .upgrade()
            .is_some_and(|slot| slot.holds(self))
    }
}

/// The connection's reference to its current guard.
///
/// Kept apart from the guard's own lock: the guard takes the slot lock while
/// holding its state lock, so the slot lock is never held while cancelling.
#[derive(Debug, Default)]
pub(crate) struct GuardSlot {
    current: Mutex<Option<Arc<TimeoutGuard>>>,
}

impl GuardSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install `guard` as current, returning the guard it displaced.
    pub(crate) fn replace(&self, guard: Arc<TimeoutGuard>) -> Option<Arc<TimeoutGuard>> {
        self.lock().replace(guard)
    }

    pub(crate) fn take(&self) -> Option<Arc<TimeoutGuard>> {
        self.lock().take()
    }

    pub(crate) fn current(&self) -> Option<Arc<TimeoutGuard>> {
        self.lock().clone()
    }

    fn holds(&self, guard: &TimeoutGuard) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|current| ptr::eq(Arc::as_ptr(current), guard))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<TimeoutGuard>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
