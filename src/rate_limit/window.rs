//! Fixed-window request counting per operation.

use std::collections::BTreeMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

/// A fixed counting window for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitWindow {
    pub request_count: u32,
    pub window_start: u64,
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitWindow {
    fn new(now: u64, window_ms: u64, max_requests: u32) -> Self {
        Self {
            request_count: 1,
            window_start: now,
            window_ms,
            max_requests,
        }
    }

    pub fn reset_at(&self) -> u64 {
        self.window_start.saturating_add(self.window_ms)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_at()
    }

    /// True while the window is live and more than `max_requests` were counted.
    pub fn is_exhausted(&self, now: u64) -> bool {
        !self.is_expired(now) && self.request_count > self.max_requests
    }
}

/// Point-in-time view of one operation's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub count: u32,
    pub max_requests: u32,
    pub reset_at: u64,
    pub time_until_reset_ms: u64,
    pub is_limited: bool,
}

/// Per-operation windows, shared by all callers of one executor.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, RateLimitWindow>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request against `operation` and report whether it is now limited.
    ///
    /// The first `max_requests` requests of a window are allowed. An expired
    /// window is replaced by a new one using the given parameters.
    pub fn apply(&self, operation: &str, window_ms: u64, max_requests: u32, now: u64) -> bool {
        match self.windows.entry(operation.to_string()) {
            Entry::Vacant(entry) => entry
                .insert(RateLimitWindow::new(now, window_ms, max_requests))
                .is_exhausted(now),
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                if window.is_expired(now) {
                    *window = RateLimitWindow::new(now, window_ms, max_requests);
                } else {
                    window.request_count = window.request_count.saturating_add(1);
                }
                window.is_exhausted(now)
            }
        }
    }

    pub fn is_limited(&self, operation: &str, now: u64) -> bool {
        self.windows
            .get(operation)
            .is_some_and(|w| w.is_exhausted(now))
    }

    pub fn window(&self, operation: &str) -> Option<RateLimitWindow> {
        self.windows.get(operation).map(|w| *w.value())
    }

    pub fn status(&self, now: u64) -> BTreeMap<String, RateLimitStatus> {
        self.windows
            .iter()
            .map(|r| {
                let w = r.value();
                let reset_at = w.reset_at();
                (
                    r.key().clone(),
                    RateLimitStatus {
                        count: w.request_count,
                        max_requests: w.max_requests,
                        reset_at,
                        time_until_reset_ms: reset_at.saturating_sub(now),
                        is_limited: w.is_exhausted(now),
                    },
                )
            })
            .collect()
    }
}
