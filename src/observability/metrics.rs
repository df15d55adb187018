//! Metrics collection and exposition.
//!
//! # Metrics
//! - `netguard_guards_armed_total` (counter): timeout guards submitted
//! - `netguard_guards_cancelled_total` (counter): guards disarmed before firing
//! - `netguard_timeouts_fired_total` (counter): guards that aborted a connection
//! - `netguard_submissions_rejected_total` (counter): scheduler refusals
//! - `netguard_aborts_total` (counter): connection aborts by reason

use std::net::SocketAddr;

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Why a connection was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// A caller requested the abort.
    Requested,
    /// A timeout guard fired.
    Timeout,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::Requested => "requested",
            AbortReason::Timeout => "timeout",
        }
    }
}

/// Install the Prometheus recorder and serve metrics on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            register_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
        }
    }
}

fn register_metrics() {
    describe_counter!("netguard_guards_armed_total", "Timeout guards submitted to a scheduler");
    describe_counter!("netguard_guards_cancelled_total", "Timeout guards disarmed before firing");
    describe_counter!("netguard_timeouts_fired_total", "Timeout guards that aborted a connection");
    describe_counter!(
        "netguard_submissions_rejected_total",
        "Guard submissions refused by the scheduler"
    );
    describe_counter!("netguard_aborts_total", "Connection aborts by reason");
}

pub fn record_guard_armed() {
    metrics::counter!("netguard_guards_armed_total").increment(1);
}

pub fn record_guard_cancelled() {
    metrics::counter!("netguard_guards_cancelled_total").increment(1);
}

pub fn record_timeout_fired() {
    metrics::counter!("netguard_timeouts_fired_total").increment(1);
}

pub fn record_submission_rejected() {
    metrics::counter!("netguard_submissions_rejected_total").increment(1);
}

pub fn record_abort(reason: AbortReason) {
    metrics::counter!("netguard_aborts_total", "reason" => reason.as_str()).increment(1);
}
