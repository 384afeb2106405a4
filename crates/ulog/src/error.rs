//! Error types for the logging facade and its backends.

use thiserror::Error;

/// Errors that can occur in the logging system.
///
/// Only [`LogError::Connection`] and [`LogError::InvalidConfig`] are meant to
/// reach the caller of [`Logger::init`](crate::Logger::init); everything else
/// is recovered from inside the write or read path.
#[derive(Debug, Error)]
pub enum LogError {
    /// The backend could not be reached or is misconfigured.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single record could not be persisted.
    #[error("write failed: {0}")]
    Write(String),

    /// A stored line could not be reconstructed into a record.
    #[error("parse error: {0}")]
    Parse(String),

    /// A log directory or file could not be read.
    #[error("query failed: {0}")]
    Query(String),

    /// Moving or deleting a file during rotation failed.
    #[error("rotation failed: {0}")]
    Rotation(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend has been closed.
    #[error("backend closed")]
    Closed,

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Returns true if the error is recovered from rather than surfaced.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Connection(_) | Self::InvalidConfig(_))
    }
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
