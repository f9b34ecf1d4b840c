//! REST client subsystem.
//!
//! # Data Flow
//! ```text
//! ApiClient::get_json(operation, path)
//!     → join path onto base URL
//!     → ResilientExecutor::execute(send request, options for operation)
//!         → reqwest (bearer token attached)
//!         → non-2xx → RequestFailure::Status(HttpFailure { status, body })
//!     → deserialize JSON body
//! ```
//!
//! # Design Decisions
//! - The bearer token is opaque; obtaining and refreshing it is the caller's job
//! - Response bodies of failed requests become the failure message and are
//!   classified by text before status

pub mod api;

pub use api::{ApiClient, RequestFailure};
