//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Connection::execute(op)
//!     → resilience::policy (open an OperationScope, arming a guard)
//!     → transport.rs (blocking read/write on the caller's thread)
//!     → scope dropped (guard disarmed)
//!
//! Abort (caller or fired guard):
//!     → abort.rs (flip closed flag once, hard-terminate transport)
//!     → blocked read on the I/O thread fails
//!
//! Connection States:
//!     Open → Closed
//! ```
//!
//! # Design Decisions
//! - Abort is a hard termination; no protocol goodbye is attempted
//! - The closed flag is the single source of truth for both close and abort
//! - Transports only need to know how to tear themselves down

pub mod abort;
pub mod connection;
pub mod transport;

pub use abort::AbortHandle;
pub use connection::{Connection, ConnectionId, ConnectionState};
pub use transport::{TcpTransport, Transport};
