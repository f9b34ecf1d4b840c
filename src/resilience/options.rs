//! Per-call options.

use crate::config::ExecutorConfig;

/// Operation name used when the caller does not supply one.
pub const DEFAULT_OPERATION: &str = "unknown";

/// Options for one [`execute`](crate::ResilientExecutor::execute) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Failures at which the circuit opens.
    pub circuit_breaker_threshold: u32,
    /// Cooldown after the last failure before a probe is allowed.
    pub circuit_breaker_timeout_ms: u64,
    /// Bucketing key for all tracking state.
    pub operation_name: String,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::from_config(&ExecutorConfig::default(), DEFAULT_OPERATION)
    }
}

impl CallOptions {
    /// Options named `operation` with every other field taken from `config`.
    pub fn from_config(config: &ExecutorConfig, operation: &str) -> Self {
        Self {
            max_retries: config.retry.max_retries,
            base_delay_ms: config.retry.base_delay_ms,
            max_delay_ms: config.retry.max_delay_ms,
            circuit_breaker_threshold: config.circuit_breaker.threshold,
            circuit_breaker_timeout_ms: config.circuit_breaker.timeout_ms,
            operation_name: operation.to_string(),
        }
    }

    pub fn named(operation: &str) -> Self {
        Self::from_config(&ExecutorConfig::default(), operation)
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn delays(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn circuit_breaker(mut self, threshold: u32, timeout_ms: u64) -> Self {
        self.circuit_breaker_threshold = threshold;
        self.circuit_breaker_timeout_ms = timeout_ms;
        self
    }
}
