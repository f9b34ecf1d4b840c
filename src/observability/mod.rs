//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Executor decisions (attempt, failure, retry, fast-fail):
//!     → tracing events inside an `execute` span (operation, call_id)
//!     → metrics.rs counters and histograms
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Call ID flows through every event of one execute call
//! - Metrics are cheap (atomic increments)
//! - `init` wires both from `[observability]`; the exporter only when enabled

pub mod logging;
pub mod metrics;

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

use crate::config::ObservabilityConfig;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Install logging and, when `metrics_enabled`, the Prometheus exporter.
///
/// The metrics address is parsed before anything is installed. Must be
/// called from within a Tokio runtime when metrics are enabled.
pub fn init(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let metrics_addr = if config.metrics_enabled {
        Some(config.metrics_address.parse::<SocketAddr>()?)
    } else {
        None
    };

    init_logging(config)?;
    if let Some(addr) = metrics_addr {
        init_metrics(addr)?;
    }
    Ok(())
}
