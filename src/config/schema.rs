//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NetguardConfig {
    /// Network timeout settings applied to new connections.
    pub timeouts: TimeoutConfig,

    /// Scheduler running the timeout guards.
    pub scheduler: SchedulerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Settings for the `netguard-probe` binary.
    pub probe: ProbeConfig,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a single blocking network operation in milliseconds.
    /// 0 disables monitoring.
    pub network_timeout_ms: u64,
}

/// Which scheduler implementation runs the timeout guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Dedicated OS worker threads.
    #[default]
    Pool,
    /// The tokio runtime's blocking pool.
    Tokio,
    /// The calling thread.
    Inline,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,

    /// Worker thread count for the pool flavor. A single thread can monitor
    /// many connections.
    pub worker_threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            kind: SchedulerKind::Pool,
            worker_threads: 1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Endpoint to connect to (e.g., "127.0.0.1:5432").
    pub address: String,

    /// Size of the read buffer for the monitored read.
    pub read_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5432".to_string(),
            read_bytes: 1024,
        }
    }
}
