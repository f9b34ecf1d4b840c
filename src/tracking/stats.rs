//! Statistics snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ErrorKind;
use crate::tracking::errors::LastError;

/// Aggregate failure statistics at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    /// Failures still tracked, regardless of age.
    pub total_errors: u64,
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
    pub errors_by_operation: BTreeMap<String, u64>,
    /// Last errors inside the recent window, newest first.
    pub recent_errors: Vec<LastError>,
}

impl ErrorStats {
    pub fn count_for(&self, kind: ErrorKind) -> u64 {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }
}
