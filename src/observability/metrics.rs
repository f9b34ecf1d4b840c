//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_attempts_total` (counter): operation invocations by operation
//! - `resilience_failures_total` (counter): failed invocations by operation, kind
//! - `resilience_retries_total` (counter): scheduled retries by operation
//! - `resilience_backoff_delay_ms` (histogram): backoff delays by operation
//! - `resilience_circuit_open_total` (counter): fast-failed calls by operation
//! - `resilience_rate_limited_total` (counter): rate-limited calls by operation
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::error::ErrorKind;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_attempt(operation: &str) {
    counter!("resilience_attempts_total", "operation" => operation.to_owned()).increment(1);
}

pub fn record_failure(operation: &str, kind: ErrorKind) {
    counter!(
        "resilience_failures_total",
        "operation" => operation.to_owned(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

pub fn record_retry(operation: &str, delay: Duration) {
    counter!("resilience_retries_total", "operation" => operation.to_owned()).increment(1);
    histogram!("resilience_backoff_delay_ms", "operation" => operation.to_owned())
        .record(delay.as_millis() as f64);
}

pub fn record_circuit_open(operation: &str) {
    counter!("resilience_circuit_open_total", "operation" => operation.to_owned()).increment(1);
}

pub fn record_rate_limited(operation: &str) {
    counter!("resilience_rate_limited_total", "operation" => operation.to_owned()).increment(1);
}
