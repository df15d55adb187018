//! Error types surfaced to callers of the connection API.

use thiserror::Error;

use crate::security::Permission;

/// Errors returned by connection configuration, abort and monitored operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument was rejected. No state was changed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller lacks the capability required for the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    /// The connection has already been closed or aborted.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// The operation failed because the connection was aborted underneath it.
    #[error("Operation aborted: {0}")]
    Aborted(#[source] std::io::Error),

    /// The operation failed with an ordinary I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
