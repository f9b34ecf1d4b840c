//! Proactive rate limiting.
//!
//! # Data Flow
//! ```text
//! Caller, before execute():
//!     → apply_rate_limit(operation)   (opens / advances / resets the window)
//!
//! execute():
//!     → is_limited(operation)         (read only; never advances the window)
//!     → RateLimited error if the window is exhausted
//! ```
//!
//! # Design Decisions
//! - Fixed windows per operation name
//! - The executor only reads window state; counting is the caller's choice
//! - Windows are independent of failure tracking and survive clear_errors

pub mod window;

pub use window::{RateLimitStatus, RateLimitWindow, RateLimiter};
