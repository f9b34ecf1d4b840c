//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failure is retryable (by classification)
//! - Stop once the attempt budget is spent
//! - Compute the backoff delay for the next attempt
//!
//! # Design Decisions
//! - Never retry auth, permission or not-found failures
//! - Jittered backoff prevents thundering herd
//! - Operations with a long failure history back off harder

use std::time::Duration;

use crate::error::ErrorKind;
use crate::resilience::backoff::calculate_backoff;

/// Why the executor stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUp {
    NonRetryable,
    Exhausted,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp(GiveUp),
}

/// Attempt budget and backoff bounds for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Decide after failed attempt `attempt` (zero-based).
    pub fn decide(&self, attempt: u32, kind: ErrorKind, error_count: u32) -> RetryDecision {
        if !kind.is_retryable() {
            return RetryDecision::GiveUp(GiveUp::NonRetryable);
        }
        if attempt >= self.max_retries {
            return RetryDecision::GiveUp(GiveUp::Exhausted);
        }
        RetryDecision::RetryAfter(calculate_backoff(
            attempt,
            self.base_delay_ms,
            self.max_delay_ms,
            error_count,
        ))
    }
}
