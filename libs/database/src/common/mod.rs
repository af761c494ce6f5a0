//! Utilities shared by all connectors

pub mod error;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::{RetryConfig, retry_with_backoff};
