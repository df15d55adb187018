//! Caller-initiated aborts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use netguard::scheduler::{Job, SchedulerError};
use netguard::{Connection, Error, Permission, PermissionSet, Scheduler, WorkerPool};

mod common;

use common::SimulatedTransport;

#[derive(Debug, Default)]
struct Refusing {
    attempts: AtomicUsize,
}

impl Scheduler for Refusing {
    fn execute(&self, _job: Job) -> Result<(), SchedulerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SchedulerError::Rejected("refusing"))
    }
}

/// Queues jobs until the test runs them by hand.
#[derive(Default)]
struct Deferred {
    jobs: Mutex<Vec<Job>>,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl Scheduler for Deferred {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

#[test]
fn test_submitted_abort_returns_before_running() {
    let conn = Connection::new(SimulatedTransport::default());
    let deferred = Deferred::default();

    conn.abort(Some(&deferred)).unwrap();
    assert!(!conn.is_closed());
    assert_eq!(conn.transport().terminations(), 0);

    let jobs: Vec<Job> = deferred.jobs.lock().unwrap().drain(..).collect();
    assert_eq!(jobs.len(), 1);
    for job in jobs {
        job();
    }
    assert!(conn.is_closed());
    assert_eq!(conn.transport().terminations(), 1);
}

#[test]
fn test_abort_interrupts_running_operation() {
    let conn = Connection::new(SimulatedTransport::default());
    let worker = conn.clone();
    let start = Instant::now();
    let handle = thread::spawn(move || worker.execute(|t| t.round_trip(Duration::from_secs(30))));

    thread::sleep(Duration::from_millis(100));
    let submitter = WorkerPool::new(1).unwrap();
    conn.abort(Some(&submitter)).unwrap();
    submitter.join();

    assert!(matches!(handle.join().unwrap(), Err(Error::Aborted(_))));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(conn.is_closed());
}

#[test]
fn test_abort_on_closed_connection() {
    let conn = Connection::new(SimulatedTransport::default());
    conn.close().unwrap();

    let submitter = WorkerPool::new(1).unwrap();
    conn.abort(Some(&submitter)).unwrap();
    conn.abort(None).unwrap();
    submitter.join();

    // Only the close touched the transport.
    assert_eq!(conn.transport().terminations(), 1);
}

#[test]
fn test_repeated_abort_tears_down_once() {
    let conn = Connection::new(SimulatedTransport::default());
    for _ in 0..3 {
        conn.abort(None).unwrap();
    }
    assert!(conn.is_closed());
    assert_eq!(conn.transport().terminations(), 1);
}

#[test]
fn test_rejected_abort_runs_inline() {
    let conn = Connection::new(SimulatedTransport::default());
    let refusing = Refusing::default();

    conn.abort(Some(&refusing)).unwrap();

    assert_eq!(refusing.attempts.load(Ordering::SeqCst), 1);
    assert!(conn.is_closed());
}

#[test]
fn test_abort_without_permission() {
    let conn = Connection::with_access_policy(
        SimulatedTransport::default(),
        Arc::new(PermissionSet::new().grant(Permission::SetNetworkTimeout)),
    );

    let err = conn.abort(None).unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Permission::Abort)));
    assert!(!conn.is_closed());
    assert_eq!(conn.transport().terminations(), 0);
}
