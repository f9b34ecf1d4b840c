//! Per-operation failure counters and last-error log.

use dashmap::DashMap;
use serde::Serialize;

use crate::error::ErrorKind;
use crate::tracking::stats::ErrorStats;

/// Identity of a fine-grained tracking bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
    pub operation: String,
    pub kind: ErrorKind,
}

impl OperationKey {
    pub fn new(operation: &str, kind: ErrorKind) -> Self {
        Self {
            operation: operation.to_string(),
            kind,
        }
    }
}

/// Failure count and timestamps (ms since epoch) for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorTracking {
    pub count: u32,
    pub first_error_at: u64,
    pub last_error_at: u64,
    /// Start of the half-open probe currently running, circuit entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_started_at: Option<u64>,
}

impl ErrorTracking {
    fn new(now: u64) -> Self {
        Self {
            count: 1,
            first_error_at: now,
            last_error_at: now,
            probe_started_at: None,
        }
    }

    fn record(&mut self, now: u64) {
        self.count = self.count.saturating_add(1);
        self.last_error_at = now;
    }

    /// True while a probe started less than `timeout_ms` ago is outstanding.
    ///
    /// A probe older than the timeout is treated as abandoned.
    pub fn probe_in_flight(&self, now: u64, timeout_ms: u64) -> bool {
        self.probe_started_at
            .is_some_and(|started| now.saturating_sub(started) < timeout_ms)
    }
}

/// Most recent failure for a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub operation: String,
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub timestamp: u64,
}

/// Thread-safe failure bookkeeping shared by all calls of one executor.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Coarse counts by operation name, read by the circuit breaker.
    circuit: DashMap<String, ErrorTracking>,
    /// Fine-grained counts by (operation, kind).
    by_kind: DashMap<OperationKey, ErrorTracking>,
    last_errors: DashMap<OperationKey, LastError>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure and return the updated fine-grained count.
    pub(crate) fn record_failure(
        &self,
        operation: &str,
        kind: ErrorKind,
        message: String,
        status: Option<u16>,
        now: u64,
    ) -> u32 {
        self.circuit
            .entry(operation.to_string())
            .and_modify(|t| t.record(now))
            .or_insert_with(|| ErrorTracking::new(now));

        let key = OperationKey::new(operation, kind);
        let count = self
            .by_kind
            .entry(key.clone())
            .and_modify(|t| t.record(now))
            .or_insert_with(|| ErrorTracking::new(now))
            .count;

        self.last_errors.insert(
            key,
            LastError {
                operation: operation.to_string(),
                kind,
                message,
                status,
                timestamp: now,
            },
        );

        count
    }

    /// Coarse tracking for the circuit breaker.
    pub fn circuit_tracking(&self, operation: &str) -> Option<ErrorTracking> {
        self.circuit.get(operation).map(|r| *r.value())
    }

    /// Claim the half-open probe for `operation`.
    ///
    /// Returns false if another caller's probe is still in flight. The claim
    /// is released by a success (entry removed) or by [`Self::trip_circuit`].
    pub(crate) fn begin_probe(&self, operation: &str, timeout_ms: u64, now: u64) -> bool {
        match self.circuit.get_mut(operation) {
            Some(mut tracking) => {
                if tracking.probe_in_flight(now, timeout_ms) {
                    return false;
                }
                tracking.probe_started_at = Some(now);
                true
            }
            // Cleared by a concurrent success; the circuit is closed again.
            None => true,
        }
    }

    /// Force the circuit count up to `threshold` so the next check sees it open.
    pub(crate) fn trip_circuit(&self, operation: &str, threshold: u32, now: u64) {
        self.circuit
            .entry(operation.to_string())
            .and_modify(|t| {
                t.count = t.count.max(threshold);
                t.last_error_at = now;
                t.probe_started_at = None;
            })
            .or_insert(ErrorTracking {
                count: threshold,
                first_error_at: now,
                last_error_at: now,
                probe_started_at: None,
            });
    }

    /// Fine-grained count for one (operation, kind) bucket.
    pub fn error_count(&self, operation: &str, kind: ErrorKind) -> u32 {
        self.by_kind
            .get(&OperationKey::new(operation, kind))
            .map(|r| r.count)
            .unwrap_or(0)
    }

    /// True if any counter exists for the operation.
    pub fn is_tracked(&self, operation: &str) -> bool {
        self.circuit.contains_key(operation)
            || self.by_kind.iter().any(|r| r.key().operation == operation)
    }

    /// Drop the failure history of an operation after it succeeds.
    ///
    /// Last errors are kept for reporting.
    pub(crate) fn clear_operation(&self, operation: &str) {
        self.circuit.remove(operation);
        self.by_kind.retain(|k, _| k.operation != operation);
    }

    /// Clear counters and last errors for one operation, or for all of them.
    pub(crate) fn clear(&self, operation: Option<&str>) {
        match operation {
            Some(op) => {
                self.clear_operation(op);
                self.last_errors.retain(|k, _| k.operation != op);
            }
            None => {
                self.circuit.clear();
                self.by_kind.clear();
                self.last_errors.clear();
            }
        }
    }

    /// Aggregate a snapshot; `recent_window_ms` bounds `recent_errors`.
    pub fn stats(&self, now: u64, recent_window_ms: u64) -> ErrorStats {
        let mut stats = ErrorStats::default();

        for entry in self.by_kind.iter() {
            let count = u64::from(entry.value().count);
            stats.total_errors += count;
            *stats.errors_by_kind.entry(entry.key().kind).or_default() += count;
            *stats
                .errors_by_operation
                .entry(entry.key().operation.clone())
                .or_default() += count;
        }

        stats.recent_errors = self
            .last_errors
            .iter()
            .filter(|r| now.saturating_sub(r.value().timestamp) < recent_window_ms)
            .map(|r| r.value().clone())
            .collect();
        stats.recent_errors.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.operation.cmp(&b.operation))
        });

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: u64 = 3_600_000;

    fn fail(tracker: &ErrorTracker, op: &str, kind: ErrorKind, now: u64) -> u32 {
        tracker.record_failure(op, kind, format!("{kind} failure"), None, now)
    }

    #[test]
    fn test_counts_split_by_kind_but_circuit_is_coarse() {
        let tracker = ErrorTracker::new();
        assert_eq!(fail(&tracker, "repos", ErrorKind::Network, 10), 1);
        assert_eq!(fail(&tracker, "repos", ErrorKind::Network, 20), 2);
        assert_eq!(fail(&tracker, "repos", ErrorKind::Server, 30), 1);

        let circuit = tracker.circuit_tracking("repos").unwrap();
        assert_eq!(circuit.count, 3);
        assert_eq!(circuit.first_error_at, 10);
        assert_eq!(circuit.last_error_at, 30);

        assert_eq!(tracker.error_count("repos", ErrorKind::Network), 2);
        assert_eq!(tracker.error_count("repos", ErrorKind::Server), 1);
        assert_eq!(tracker.error_count("repos", ErrorKind::Auth), 0);
    }

    #[test]
    fn test_clear_operation_keeps_others() {
        let tracker = ErrorTracker::new();
        fail(&tracker, "repos", ErrorKind::Network, 1);
        fail(&tracker, "repos_list", ErrorKind::Network, 1);

        tracker.clear_operation("repos");

        assert!(!tracker.is_tracked("repos"));
        // Shares a prefix but is a different operation.
        assert!(tracker.is_tracked("repos_list"));
        // Last error survives a success.
        assert_eq!(tracker.stats(1, HOUR_MS).recent_errors.len(), 2);
    }

    #[test]
    fn test_clear_named_and_all() {
        let tracker = ErrorTracker::new();
        fail(&tracker, "a", ErrorKind::Server, 1);
        fail(&tracker, "b", ErrorKind::Server, 1);

        tracker.clear(Some("a"));
        let stats = tracker.stats(1, HOUR_MS);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.recent_errors.len(), 1);
        assert_eq!(stats.recent_errors[0].operation, "b");

        tracker.clear(None);
        let stats = tracker.stats(1, HOUR_MS);
        assert_eq!(stats.total_errors, 0);
        assert!(stats.recent_errors.is_empty());
        assert!(tracker.circuit_tracking("b").is_none());
    }

    #[test]
    fn test_trip_circuit() {
        let tracker = ErrorTracker::new();
        fail(&tracker, "a", ErrorKind::Server, 5);
        tracker.trip_circuit("a", 4, 9);

        let circuit = tracker.circuit_tracking("a").unwrap();
        assert_eq!(circuit.count, 4);
        assert_eq!(circuit.last_error_at, 9);

        tracker.trip_circuit("fresh", 2, 11);
        assert_eq!(tracker.circuit_tracking("fresh").unwrap().count, 2);
    }

    #[test]
    fn test_single_half_open_claim() {
        let tracker = ErrorTracker::new();
        fail(&tracker, "a", ErrorKind::Server, 0);

        assert!(tracker.begin_probe("a", 1000, 100));
        assert!(!tracker.begin_probe("a", 1000, 200));
        assert!(tracker.circuit_tracking("a").unwrap().probe_in_flight(200, 1000));

        // Failed probe releases the claim.
        tracker.trip_circuit("a", 1, 300);
        assert_eq!(tracker.circuit_tracking("a").unwrap().probe_started_at, None);
        assert!(tracker.begin_probe("a", 1000, 1300));

        // Abandoned probe is replaced after the timeout.
        assert!(!tracker.begin_probe("a", 1000, 2299));
        assert!(tracker.begin_probe("a", 1000, 2300));

        // Successful probe removes the entry.
        tracker.clear_operation("a");
        assert!(tracker.circuit_tracking("a").is_none());
    }

    #[test]
    fn test_stats_recent_window() {
        let tracker = ErrorTracker::new();
        fail(&tracker, "old", ErrorKind::Server, 0);
        fail(&tracker, "new", ErrorKind::Network, HOUR_MS + 10);
        fail(&tracker, "new", ErrorKind::Network, HOUR_MS + 20);

        let stats = tracker.stats(HOUR_MS + 30, HOUR_MS);
        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.errors_by_kind[&ErrorKind::Server], 1);
        assert_eq!(stats.errors_by_kind[&ErrorKind::Network], 2);
        assert_eq!(stats.errors_by_operation["old"], 1);
        assert_eq!(stats.errors_by_operation["new"], 2);

        assert_eq!(stats.recent_errors.len(), 1);
        assert_eq!(stats.recent_errors[0].operation, "new");
        assert_eq!(stats.recent_errors[0].timestamp, HOUR_MS + 20);
    }
}
