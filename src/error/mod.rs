//! Error classification and the executor's error type.
//!
//! # Data Flow
//! ```text
//! operation fails with E: ApiFailure
//!     → classification.rs (message + status → ErrorKind)
//!     → retry policy decides retry / give up
//!     → CallError<E> surfaces to the caller
//!     → messages.rs (ErrorKind → user-facing string)
//! ```
//!
//! # Design Decisions
//! - Message checks run before status checks, even when they disagree
//! - Friendly messages are a pure function of the classification
//! - Fast-fail errors (circuit open, rate limited) never wrap an upstream error

pub mod classification;
pub mod messages;

use thiserror::Error;

pub use classification::{classify, ApiFailure, ErrorKind, HttpFailure};
pub use messages::friendly_message;

/// Error returned by [`ResilientExecutor::execute`](crate::ResilientExecutor::execute).
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Too many recent failures; the operation was not invoked.
    #[error("Circuit breaker is open for operation '{operation}'")]
    CircuitOpen { operation: String },

    /// The operation's rate-limit window is exhausted; the operation was not invoked.
    #[error("Rate limit exceeded for operation '{operation}', resets at {reset_at}")]
    RateLimited { operation: String, reset_at: u64 },

    /// The operation itself failed (possibly after retries).
    #[error("{source}")]
    Upstream { kind: ErrorKind, source: E },
}

impl<E> CallError<E> {
    /// Classification used for the friendly message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::CircuitOpen { .. } => ErrorKind::Server,
            CallError::RateLimited { .. } => ErrorKind::RateLimit,
            CallError::Upstream { kind, .. } => *kind,
        }
    }

    /// The upstream error, if the operation was actually invoked.
    pub fn upstream(&self) -> Option<&E> {
        match self {
            CallError::Upstream { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn into_upstream(self) -> Option<E> {
        match self {
            CallError::Upstream { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for executor calls.
pub type CallResult<T, E> = Result<T, CallError<E>>;
