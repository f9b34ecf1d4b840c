//! User-facing messages per error classification.

use crate::error::classification::ErrorKind;

/// A stable, display-ready message for a classification.
pub fn friendly_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::RateLimit => "API rate limit reached. Please wait a moment and try again.",
        ErrorKind::Network => "Network error. Please check your internet connection and try again.",
        ErrorKind::Auth => "Your session has expired. Please sign in again.",
        ErrorKind::Permission => "You don't have permission to access this resource.",
        ErrorKind::NotFound => "The requested resource could not be found.",
        ErrorKind::Server => "The service is having trouble right now. Please try again later.",
        ErrorKind::General => "Something went wrong. Please try again.",
    }
}
