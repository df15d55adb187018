//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Guards, watchdogs and connections produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Connection ID is attached to every event
//! - Metrics are cheap (atomic increments); recording without an
//!   installed recorder is a no-op

pub mod logging;
pub mod metrics;
