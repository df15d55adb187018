//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and addresses
//! - Reject scheduler/timeout combinations that cannot monitor anything
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NetguardConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{NetguardConfig, SchedulerKind};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &NetguardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.scheduler.kind == SchedulerKind::Pool && config.scheduler.worker_threads == 0 {
        errors.push(ValidationError::new(
            "scheduler.worker_threads",
            "must be at least 1",
        ));
    }

    // An inline guard would hold the I/O thread for the entire budget.
    if config.scheduler.kind == SchedulerKind::Inline && config.timeouts.network_timeout_ms > 0 {
        errors.push(ValidationError::new(
            "scheduler.kind",
            "inline scheduler cannot monitor a positive network timeout",
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid address '{}'", config.observability.metrics_address),
        ));
    }

    if config.probe.read_bytes == 0 {
        errors.push(ValidationError::new("probe.read_bytes", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
