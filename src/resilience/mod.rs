//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! execute(operation, options):
//!     → circuit_breaker.rs (fast-fail if open, probe if cooled down)
//!     → rate-limit window check (fast-fail if exhausted)
//!     → invoke operation
//!     → On failure: classify, record, retries.rs (retry or give up)
//!     → backoff.rs (delay before the next attempt)
//!     → On success: clear the operation's failure history
//! ```
//!
//! # Design Decisions
//! - No timeout is imposed on the operation itself; only the retry envelope is bounded
//! - Retries only for retryable classifications
//! - Circuit breaker prevents hammering a failing API
//! - A backoff sleep, once started, is not cancelled

pub mod backoff;
pub mod circuit_breaker;
pub mod executor;
pub mod options;
pub mod retries;

pub use executor::ResilientExecutor;
pub use options::CallOptions;
