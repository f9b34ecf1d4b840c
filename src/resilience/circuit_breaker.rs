//! Circuit breaker for per-operation protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed broken, calls fail fast
//! - Half-Open: cooldown elapsed, one probe call is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: timeout elapsed since the last failure
//! Half-Open → Open: probe claimed, other callers fail fast
//! Probe → Closed: probe succeeds
//! Probe → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - Per-operation circuit breaker (not global)
//! - State is derived from the coarse failure tracking on every check,
//!   including the in-flight probe marker
//! - Single probe in Half-Open; a probe outstanding longer than the timeout
//!   counts as abandoned

use crate::tracking::ErrorTracking;

/// Result of a circuit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Fail fast until `retry_at` (ms since epoch).
    Open { retry_at: u64 },
    HalfOpen,
}

/// Threshold and cooldown for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreaker {
    pub threshold: u32,
    pub timeout_ms: u64,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout_ms: u64) -> Self {
        Self {
            threshold,
            timeout_ms,
        }
    }

    pub fn check(&self, tracking: Option<&ErrorTracking>, now: u64) -> CircuitState {
        let Some(tracking) = tracking else {
            return CircuitState::Closed;
        };

        if tracking.count < self.threshold {
            return CircuitState::Closed;
        }

        if tracking.probe_in_flight(now, self.timeout_ms) {
            let started = tracking.probe_started_at.unwrap_or(now);
            return CircuitState::Open {
                retry_at: started.saturating_add(self.timeout_ms),
            };
        }

        if now.saturating_sub(tracking.last_error_at) < self.timeout_ms {
            CircuitState::Open {
                retry_at: tracking.last_error_at.saturating_add(self.timeout_ms),
            }
        } else {
            CircuitState::HalfOpen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking(count: u32, last_error_at: u64) -> ErrorTracking {
        ErrorTracking {
            count,
            first_error_at: 0,
            last_error_at,
            probe_started_at: None,
        }
    }

    #[test]
    fn test_closed_without_history() {
        let cb = CircuitBreaker::new(5, 60_000);
        assert_eq!(cb.check(None, 0), CircuitState::Closed);
        assert_eq!(cb.check(Some(&tracking(4, 100)), 100), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let cb = CircuitBreaker::new(5, 60_000);
        assert_eq!(
            cb.check(Some(&tracking(5, 100)), 200),
            CircuitState::Open { retry_at: 60_100 }
        );
        assert_eq!(
            cb.check(Some(&tracking(9, 100)), 60_099),
            CircuitState::Open { retry_at: 60_100 }
        );
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let cb = CircuitBreaker::new(5, 60_000);
        assert_eq!(cb.check(Some(&tracking(5, 100)), 60_100), CircuitState::HalfOpen);
    }

    #[test]
    fn test_open_while_half_open_call_in_flight() {
        let cb = CircuitBreaker::new(5, 60_000);
        let probing = ErrorTracking {
            probe_started_at: Some(60_100),
            ..tracking(5, 100)
        };
        assert_eq!(
            cb.check(Some(&probing), 60_200),
            CircuitState::Open { retry_at: 120_100 }
        );
        assert_eq!(cb.check(Some(&probing), 120_100), CircuitState::HalfOpen);
    }
}
