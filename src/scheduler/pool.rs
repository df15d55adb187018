//! Fixed-size pool of OS worker threads.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::{Job, Scheduler, SchedulerError};

/// A pool of worker threads draining a shared job queue.
///
/// After [`WorkerPool::shutdown`] every submission is rejected; jobs already
/// queued still run.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers (at least one).
    pub fn new(threads: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let rx = Arc::clone(&rx);
            let handle = thread::Builder::new()
                .name(format!("netguard-worker-{index}"))
                .spawn(move || worker_loop(rx))?;
            workers.push(handle);
        }

        tracing::debug!(threads = workers.len(), "Worker pool started");
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    /// Stop accepting jobs. Workers exit once the queue is drained.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            tracing::debug!("Worker pool shutting down");
        }
    }

    /// Shut down and wait for every worker to finish its queued jobs.
    pub fn join(&self) {
        self.shutdown();
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked outside a job");
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Scheduler for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx
                .send(job)
                .map_err(|_| SchedulerError::Rejected("worker pool has no live workers")),
            None => Err(SchedulerError::Rejected("worker pool is shut down")),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers are detached; they exit on their own once the sender is gone.
        self.shutdown();
    }
}

fn worker_loop(rx: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let rx = rx.lock().unwrap_or_else(PoisonError::into_inner);
            rx.recv()
        };
        let Ok(job) = job else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Scheduled job panicked");
        }
    }
}
