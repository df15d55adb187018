//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Privileged connection call (abort, configure timeout):
//!     → access_control.rs (AccessPolicy::check for the required Permission)
//!     → Err(PermissionDenied) before any state changes, or proceed
//! ```
//!
//! # Design Decisions
//! - Fail closed: a policy that does not grant a permission denies it
//! - The check runs after the closed-connection check for abort, so aborting
//!   a closed connection is always a no-op

pub mod access_control;

pub use access_control::{AccessPolicy, AllowAll, Permission, PermissionSet};
