//! Resilience subsystem: network timeouts.
//!
//! # Data Flow
//! ```text
//! Connection::configure_network_timeout(ms, scheduler)
//!     → policy.rs (validate, attach/detach the watchdog)
//!
//! Monitored operation:
//!     → watchdog.rs on_operation_start (arm a fresh guard, submit to scheduler)
//!         → timeouts.rs TimeoutGuard::run on a scheduler thread
//!             (wait remaining budget; fire AbortHandle unless cancelled)
//!     → watchdog.rs on_operation_end (cancel that exact guard)
//! ```
//!
//! # Design Decisions
//! - Exactly one live guard per connection
//! - Cancellation wins ties: a guard cancelled before it fires never fires
//! - Queueing delay on a shared scheduler is subtracted from the wait
//! - A scheduler that rejects work disables monitoring until reconfigured

pub mod policy;
pub mod timeouts;
pub mod watchdog;

pub use policy::TimeoutPolicy;
pub use timeouts::{GuardState, TimeoutGuard};
pub use watchdog::{OperationScope, OperationWatchdog};
