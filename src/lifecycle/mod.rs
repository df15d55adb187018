//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → trigger() → runtime-backed schedulers reject new jobs
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown is a level, not an edge: late subscribers still observe it
//! - Rejected submissions degrade timeout monitoring instead of failing I/O

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
