//! The resilient call executor.
//!
//! # Responsibilities
//! - Fail fast when an operation's circuit is open or its window is exhausted
//! - Invoke the operation, retrying retryable failures with backoff
//! - Record every failure for circuit breaking and statistics
//! - Wipe an operation's failure history when it succeeds

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::ExecutorConfig;
use crate::error::{friendly_message, ApiFailure, CallError, CallResult};
use crate::observability::metrics;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::options::CallOptions;
use crate::resilience::retries::{RetryDecision, RetryPolicy};
use crate::tracking::{ErrorStats, ErrorTracker};

/// Wraps outbound calls with circuit breaking, rate-limit checks and retries.
///
/// One instance is meant to be created at startup and shared (usually via
/// `Arc`) by every caller for the lifetime of the process. All tracking state
/// lives inside the instance.
#[derive(Debug)]
pub struct ResilientExecutor {
    config: ArcSwap<ExecutorConfig>,
    tracker: ErrorTracker,
    rate_limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl ResilientExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an executor that reads time from `clock`.
    pub fn with_clock(config: ExecutorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            tracker: ErrorTracker::new(),
            rate_limiter: RateLimiter::new(),
            clock,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<ExecutorConfig> {
        self.config.load_full()
    }

    /// Replace the configuration. Calls already running keep their options.
    pub fn apply_config(&self, config: ExecutorConfig) {
        tracing::info!(
            max_retries = config.retry.max_retries,
            circuit_threshold = config.circuit_breaker.threshold,
            "Executor configuration updated"
        );
        self.config.store(Arc::new(config));
    }

    /// Apply every configuration received on `updates` until the sender is dropped.
    pub fn spawn_config_updates(
        self: &Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<ExecutorConfig>,
    ) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                executor.apply_config(config);
            }
            tracing::debug!("Config update channel closed");
        })
    }

    /// Options for `operation` using the current configured defaults.
    pub fn options(&self, operation: &str) -> CallOptions {
        CallOptions::from_config(&self.config.load(), operation)
    }

    /// Run `operation` under the resilience envelope described by `options`.
    ///
    /// Returns the operation's value, or one of:
    /// - [`CallError::CircuitOpen`] without invoking the operation,
    /// - [`CallError::RateLimited`] without invoking the operation,
    /// - [`CallError::Upstream`] with the last failure once retries are exhausted
    ///   or the failure is not retryable.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: F,
        options: &CallOptions,
    ) -> CallResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ApiFailure,
    {
        let span = tracing::info_span!(
            "execute",
            operation = %options.operation_name,
            call_id = %Uuid::new_v4()
        );
        self.execute_inner(operation, options).instrument(span).await
    }

    async fn execute_inner<T, E, F, Fut>(
        &self,
        mut operation: F,
        options: &CallOptions,
    ) -> CallResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ApiFailure,
    {
        let name = options.operation_name.as_str();
        let now = self.clock.now_ms();

        let breaker = CircuitBreaker::new(
            options.circuit_breaker_threshold,
            options.circuit_breaker_timeout_ms,
        );
        let mut probe = false;
        match breaker.check(self.tracker.circuit_tracking(name).as_ref(), now) {
            CircuitState::Open { retry_at } => {
                tracing::warn!(retry_at, "Circuit open, failing fast");
                metrics::record_circuit_open(name);
                return Err(CallError::CircuitOpen {
                    operation: name.to_string(),
                });
            }
            CircuitState::HalfOpen => {
                if !self.tracker.begin_probe(name, breaker.timeout_ms, now) {
                    tracing::warn!("Circuit probe already in flight, failing fast");
                    metrics::record_circuit_open(name);
                    return Err(CallError::CircuitOpen {
                        operation: name.to_string(),
                    });
                }
                tracing::info!("Circuit cooldown elapsed, sending probe");
                probe = true;
            }
            CircuitState::Closed => {}
        }

        if let Some(window) = self
            .rate_limiter
            .window(name)
            .filter(|w| w.is_exhausted(now))
        {
            let reset_at = window.reset_at();
            tracing::warn!(reset_at, "Rate limit window exhausted, failing fast");
            metrics::record_rate_limited(name);
            return Err(CallError::RateLimited {
                operation: name.to_string(),
                reset_at,
            });
        }

        let policy = RetryPolicy {
            max_retries: if probe { 0 } else { options.max_retries },
            base_delay_ms: options.base_delay_ms,
            max_delay_ms: options.max_delay_ms,
        };

        let mut attempt = 0u32;
        loop {
            metrics::record_attempt(name);
            let err = match operation().await {
                Ok(value) => {
                    self.tracker.clear_operation(name);
                    if attempt > 0 || probe {
                        tracing::info!(attempts = attempt + 1, probe, "Operation recovered");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            let now = self.clock.now_ms();
            let error_count =
                self.tracker
                    .record_failure(name, kind, err.message(), err.status_code(), now);
            metrics::record_failure(name, kind);
            if probe {
                self.tracker
                    .trip_circuit(name, options.circuit_breaker_threshold, now);
            }

            match policy.decide(attempt, kind, error_count) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        kind = %kind,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying"
                    );
                    metrics::record_retry(name, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(reason) => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        kind = %kind,
                        reason = ?reason,
                        error = %err,
                        "Giving up"
                    );
                    return Err(CallError::Upstream { kind, source: err });
                }
            }
        }
    }

    /// Count a request against `operation` using the configured window.
    ///
    /// Returns true if the operation is now rate limited.
    pub fn apply_rate_limit(&self, operation: &str) -> bool {
        let config = self.config.load();
        self.apply_rate_limit_with(
            operation,
            config.rate_limit.window_ms,
            config.rate_limit.max_requests,
        )
    }

    /// Count a request against `operation` with an explicit window.
    pub fn apply_rate_limit_with(
        &self,
        operation: &str,
        window_ms: u64,
        max_requests: u32,
    ) -> bool {
        let limited = self
            .rate_limiter
            .apply(operation, window_ms, max_requests, self.clock.now_ms());
        if limited {
            tracing::debug!(operation, "Rate limit reached");
        }
        limited
    }

    pub fn is_rate_limited(&self, operation: &str) -> bool {
        self.rate_limiter.is_limited(operation, self.clock.now_ms())
    }

    /// User-facing message for an executor error.
    pub fn friendly_message<E>(&self, error: &CallError<E>) -> &'static str {
        friendly_message(error.kind())
    }

    pub fn error_stats(&self) -> ErrorStats {
        let window_ms = self
            .config
            .load()
            .stats
            .recent_window_secs
            .saturating_mul(1000);
        self.tracker.stats(self.clock.now_ms(), window_ms)
    }

    pub fn rate_limit_status(&self) -> BTreeMap<String, RateLimitStatus> {
        self.rate_limiter.status(self.clock.now_ms())
    }

    /// Clear failure tracking and last errors for one operation, or all.
    ///
    /// Rate-limit windows are not affected.
    pub fn clear_errors(&self, operation: Option<&str>) {
        self.tracker.clear(operation);
    }

    /// True if any failure counter exists for `operation`.
    pub fn is_tracked(&self, operation: &str) -> bool {
        self.tracker.is_tracked(operation)
    }

    /// Failure tracking, read-only outside the crate.
    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }
}
