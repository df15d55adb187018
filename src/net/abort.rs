//! Hard termination of a connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::net::connection::ConnectionId;
use crate::net::transport::Transport;
use crate::observability::metrics::{self, AbortReason};

/// Cloneable handle that can hard-terminate one connection from any thread.
///
/// The closed flag is shared with the owning connection. Whichever of
/// `abort` or a graceful close flips it first performs the teardown; every
/// later call is a no-op.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    closed: Arc<AtomicBool>,
}

impl AbortHandle {
    pub(crate) fn new(id: ConnectionId, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            transport,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the connection closed and tear down its transport.
    ///
    /// Returns `false` if the connection was already closed, in which case
    /// the transport is not touched.
    pub fn abort(&self, reason: AbortReason) -> bool {
        if !self.mark_closed() {
            tracing::trace!(connection_id = %self.id, "Abort on closed connection ignored");
            return false;
        }

        tracing::info!(connection_id = %self.id, reason = reason.as_str(), "Aborting connection");
        self.transport.hard_terminate();
        metrics::record_abort(reason);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Flip the closed flag. Returns `true` for the caller that flipped it.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::CountingTransport;
    use std::thread;

    #[test]
    fn tears_down_exactly_once() {
        let transport = Arc::new(CountingTransport::default());
        let handle = AbortHandle::new(ConnectionId::new(), transport.clone());

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.abort(AbortReason::Requested))
            })
            .collect();
        let performed = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|&did| did)
            .count();

        assert_eq!(performed, 1);
        assert_eq!(transport.count(), 1);
        assert!(handle.is_closed());
    }

    #[test]
    fn abort_after_close_is_noop() {
        let transport = Arc::new(CountingTransport::default());
        let handle = AbortHandle::new(ConnectionId::new(), transport.clone());

        assert!(handle.mark_closed());
        assert!(!handle.abort(AbortReason::Timeout));
        assert_eq!(transport.count(), 0);
    }
}
