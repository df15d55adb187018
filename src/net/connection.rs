//! Connection state and the caller-facing timeout/abort surface.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track open/closed state shared with the abort handle
//! - Gate privileged calls through the access policy
//! - Bracket blocking operations with the timeout watchdog

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::net::abort::AbortHandle;
use crate::net::transport::Transport;
use crate::observability::metrics::AbortReason;
use crate::resilience::policy::TimeoutPolicy;
use crate::resilience::watchdog::{OperationScope, OperationWatchdog};
use crate::scheduler::Scheduler;
use crate::security::{AccessPolicy, AllowAll, Permission};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection is usable.
    Open,
    /// Connection was closed or aborted.
    Closed,
}

#[derive(Debug)]
struct ConnectionInner<T> {
    transport: Arc<T>,
    abort: AbortHandle,
    policy: TimeoutPolicy,
    access: Arc<dyn AccessPolicy>,
}

/// A client connection over transport `T`.
///
/// Cloning is cheap and every clone refers to the same connection, so one
/// thread can run an operation while another aborts it.
#[derive(Debug)]
pub struct Connection<T: Transport + 'static> {
    inner: Arc<ConnectionInner<T>>,
}

impl<T: Transport + 'static> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> Connection<T> {
    /// Wrap `transport`, granting every permission.
    pub fn new(transport: T) -> Self {
        Self::with_access_policy(transport, Arc::new(AllowAll))
    }

    pub fn with_access_policy(transport: T, access: Arc<dyn AccessPolicy>) -> Self {
        let id = ConnectionId::new();
        let transport = Arc::new(transport);
        let abort = AbortHandle::new(id, transport.clone());
        tracing::trace!(connection_id = %id, "Connection opened");

        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                policy: TimeoutPolicy::new(abort.clone()),
                abort,
                access,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.abort.connection_id()
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn is_closed(&self) -> bool {
        self.inner.abort.is_closed()
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// A handle that can hard-terminate this connection without any checks.
    pub fn abort_handle(&self) -> AbortHandle {
        self.inner.abort.clone()
    }

    /// Hard-terminate the connection.
    ///
    /// A no-op on a closed connection, whatever the caller's permissions.
    /// Otherwise requires [`Permission::Abort`]. With a `submitter` the
    /// abort runs there and this call returns immediately; if the submitter
    /// refuses the job the abort runs on the calling thread.
    pub fn abort(&self, submitter: Option<&dyn Scheduler>) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.access.check(Permission::Abort)?;

        let handle = self.abort_handle();
        let Some(submitter) = submitter else {
            handle.abort(AbortReason::Requested);
            return Ok(());
        };

        let job = handle.clone();
        if let Err(e) = submitter.execute(Box::new(move || {
            job.abort(AbortReason::Requested);
        })) {
            tracing::warn!(connection_id = %self.id(), error = %e, "Abort submission rejected; aborting inline");
            handle.abort(AbortReason::Requested);
        }
        Ok(())
    }

    /// Close the connection gracefully. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if !self.inner.abort.mark_closed() {
            return Ok(());
        }
        tracing::debug!(connection_id = %self.id(), "Connection closed");
        self.inner.transport.close()?;
        Ok(())
    }

    /// Set the budget for every blocking network operation on this connection.
    ///
    /// `millis == 0` disables monitoring; a positive value requires a
    /// scheduler to run the timeout guards on. The scheduler must run jobs
    /// off the calling thread: with [`InlineScheduler`](crate::InlineScheduler)
    /// every operation would block for the whole budget and then abort the
    /// connection before it starts.
    pub fn configure_network_timeout(
        &self,
        millis: i64,
        scheduler: Option<Arc<dyn Scheduler>>,
    ) -> Result<()> {
        self.check_open()?;
        self.inner.access.check(Permission::SetNetworkTimeout)?;
        self.inner.policy.configure(millis, scheduler)
    }

    /// The configured budget in milliseconds; 0 when disabled.
    pub fn network_timeout(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.inner.policy.timeout_millis())
    }

    /// The watchdog to notify around blocking calls, present iff a positive
    /// timeout is configured.
    pub fn watchdog(&self) -> Option<Arc<OperationWatchdog>> {
        self.inner.policy.watchdog()
    }

    /// Start a monitored operation for a transport layer that drives its own
    /// I/O. The operation ends when the scope is dropped.
    pub fn begin_operation(&self) -> Result<OperationScope> {
        self.check_open()?;
        Ok(self.inner.policy.begin_operation())
    }

    /// Run one blocking network operation under the network timeout.
    ///
    /// If the connection is aborted while `op` is blocked, the resulting
    /// I/O error is returned as [`Error::Aborted`].
    pub fn execute<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&T) -> io::Result<R>,
    {
        let scope = self.begin_operation()?;
        let result = op(&self.inner.transport);
        drop(scope);

        result.map_err(|e| {
            if self.is_closed() {
                Error::Aborted(e)
            } else {
                Error::Io(e)
            }
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::CountingTransport;
    use crate::scheduler::InlineScheduler;
    use crate::security::PermissionSet;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn abort_on_closed_connection_is_noop() {
        let conn = Connection::with_access_policy(
            CountingTransport::default(),
            Arc::new(PermissionSet::new()),
        );
        conn.close().unwrap();

        // Closed check runs before the permission check.
        conn.abort(Some(&InlineScheduler)).unwrap();
        conn.abort(None).unwrap();
        assert_eq!(conn.transport().count(), 1);
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn abort_requires_permission() {
        let conn = Connection::with_access_policy(
            CountingTransport::default(),
            Arc::new(PermissionSet::new().grant(Permission::SetNetworkTimeout)),
        );

        assert!(matches!(
            conn.abort(None),
            Err(Error::PermissionDenied(Permission::Abort))
        ));
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.transport().count(), 0);
    }

    #[test]
    fn configure_requires_permission() {
        let conn = Connection::with_access_policy(
            CountingTransport::default(),
            Arc::new(PermissionSet::new().grant(Permission::Abort)),
        );
        assert!(matches!(
            conn.configure_network_timeout(100, Some(Arc::new(InlineScheduler))),
            Err(Error::PermissionDenied(Permission::SetNetworkTimeout))
        ));
        assert_eq!(conn.network_timeout().unwrap(), 0);
    }

    #[test]
    fn closed_connection_rejects_configuration_and_operations() {
        let conn = Connection::new(CountingTransport::default());
        conn.abort(None).unwrap();

        assert!(matches!(
            conn.configure_network_timeout(0, None),
            Err(Error::ConnectionClosed)
        ));
        assert!(matches!(conn.network_timeout(), Err(Error::ConnectionClosed)));
        assert!(matches!(conn.execute(|_| Ok(())), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn execute_maps_errors_by_connection_state() {
        let conn = Connection::new(CountingTransport::default());

        let err = conn
            .execute(|_| -> io::Result<()> { Err(io::Error::other("boom")) })
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let handle = conn.abort_handle();
        let err = conn
            .execute(|_| -> io::Result<()> {
                handle.abort(AbortReason::Requested);
                Err(io::Error::from(io::ErrorKind::ConnectionAborted))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Aborted(_)));
    }
}
