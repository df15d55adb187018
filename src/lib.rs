//! Network-operation timeouts and hard aborts for database client connections.
//!
//! A [`Connection`] can be aborted from any thread, and can be given a
//! network timeout: every blocking operation run through
//! [`Connection::execute`] arms a guard on a shared [`Scheduler`], and a
//! guard that outlives its budget aborts the connection.

// Core subsystems
pub mod config;
pub mod error;
pub mod net;
pub mod resilience;
pub mod scheduler;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::NetguardConfig;
pub use error::{Error, Result};
pub use lifecycle::Shutdown;
pub use net::{AbortHandle, Connection, ConnectionId, ConnectionState, TcpTransport, Transport};
pub use resilience::{OperationScope, OperationWatchdog, TimeoutGuard, TimeoutPolicy};
pub use scheduler::{InlineScheduler, Scheduler, SchedulerError, TokioScheduler, WorkerPool};
pub use security::{AccessPolicy, AllowAll, Permission, PermissionSet};
