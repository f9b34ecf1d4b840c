//! Failure tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Failed attempt (operation, kind):
//!     → circuit counter keyed by operation name   (circuit breaker input)
//!     → fine counter keyed by (operation, kind)    (stats + backoff penalty)
//!     → last error keyed by (operation, kind)      (reporting only)
//!
//! Successful attempt:
//!     → circuit + fine counters for the operation removed
//!
//! Snapshot:
//!     → stats.rs aggregates counters and recent last errors
//! ```
//!
//! # Design Decisions
//! - Two counters per operation: coarse for the circuit, fine for stats
//! - Maps are sharded (DashMap); no entry guard is held across an await
//! - Clearing by operation filters on the key's operation field, never on
//!   string prefixes

pub mod errors;
pub mod stats;

pub use errors::{ErrorTracker, ErrorTracking, LastError, OperationKey};
pub use stats::ErrorStats;
