//! Storage backend contract.
//!
//! The [`LogBackend`] trait is implemented by [`FileStore`](crate::FileStore)
//! and [`MemoryStore`](crate::MemoryStore). Database-backed implementations
//! translate [`LogFilter`] into their own query language but must return the
//! same results: field matches, inclusive date bounds, case-insensitive
//! substring search, newest first, then offset and limit.

use crate::error::Result;
use crate::types::{LogFilter, LogRecord};

/// Trait for log storage backends.
#[allow(async_fn_in_trait)]
pub trait LogBackend {
    /// Establishes readiness.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Connection`](crate::LogError::Connection) if the
    /// backend is unreachable or misconfigured.
    async fn connect(&self) -> Result<()>;

    /// Persists one record.
    async fn write(&self, record: &LogRecord) -> Result<()>;

    /// Returns records matching the filter, newest first, paginated.
    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogRecord>>;

    /// Releases resources. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;
}
