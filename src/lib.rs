//! Resilient execution of outbound REST API calls.
//!
//! A [`ResilientExecutor`] wraps caller-supplied async operations with
//! per-operation circuit breaking, rate-limit checks, classified retries with
//! exponential backoff, and failure statistics.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod rate_limit;
pub mod resilience;
pub mod tracking;

pub use client::ApiClient;
pub use config::ExecutorConfig;
pub use error::{ApiFailure, CallError, ErrorKind, HttpFailure};
pub use resilience::{CallOptions, ResilientExecutor};
