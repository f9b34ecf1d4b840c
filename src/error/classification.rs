//! Deterministic classification of upstream failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimit,
    Network,
    Auth,
    Permission,
    NotFound,
    Server,
    General,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::RateLimit,
        ErrorKind::Network,
        ErrorKind::Auth,
        ErrorKind::Permission,
        ErrorKind::NotFound,
        ErrorKind::Server,
        ErrorKind::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::General => "general",
        }
    }

    /// Auth, permission and not-found failures will not change on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorKind::Auth | ErrorKind::Permission | ErrorKind::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a failure from its message and optional HTTP status.
///
/// Message checks run first, so a 401 whose message mentions "network"
/// is classified as [`ErrorKind::Network`].
pub fn classify(message: &str, status: Option<u16>) -> ErrorKind {
    let message = message.to_lowercase();

    if message.contains("rate limit") {
        return ErrorKind::RateLimit;
    }
    if message.contains("network") {
        return ErrorKind::Network;
    }
    if message.contains("authentication") {
        return ErrorKind::Auth;
    }
    if message.contains("permission") {
        return ErrorKind::Permission;
    }

    match status {
        Some(401) => ErrorKind::Auth,
        Some(403) => ErrorKind::Permission,
        Some(404) => ErrorKind::NotFound,
        Some(429) => ErrorKind::RateLimit,
        Some(s) if s >= 500 => ErrorKind::Server,
        _ => ErrorKind::General,
    }
}

/// An error the executor knows how to classify.
pub trait ApiFailure: std::error::Error + Send + Sync + 'static {
    /// HTTP-like status code, if the failure carries one.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Text inspected by [`classify`].
    fn message(&self) -> String {
        self.to_string()
    }

    fn kind(&self) -> ErrorKind {
        classify(&self.message(), self.status_code())
    }
}

/// A plain failure carrying an optional status code and a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl HttpFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A failure with no status code, classified by message alone.
    pub fn without_status(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl ApiFailure for HttpFailure {
    fn status_code(&self) -> Option<u16> {
        self.status
    }
}

impl ApiFailure for reqwest::Error {
    fn status_code(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }

    fn message(&self) -> String {
        if self.is_connect() || self.is_timeout() {
            format!("network error: {}", self)
        } else {
            self.to_string()
        }
    }
}
