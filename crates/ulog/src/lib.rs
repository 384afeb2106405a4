//! # ulog
//!
//! Structured logging facade with context redaction and pluggable storage.
//!
//! This crate provides:
//!
//! - [`Logger`] — Level gate, redaction, console mirroring and dispatch
//! - [`LogRecord`] — One normalized log event
//! - [`LogLevel`] — Severity levels (Trace, Debug, Info, Warn, Error)
//! - [`LogFilter`] — Query filters shared by every backend
//! - [`Redactor`] — Sensitive-key redaction and email masking
//! - [`LogBackend`] — Storage contract (`connect`, `write`, `query`, `close`)
//! - [`FileStore`] — File-backed store with size-triggered rotation
//! - [`MemoryStore`] — Bounded in-memory store
//!
//! ## Example
//!
//! ```rust,no_run
//! use ulog::{FileStore, FileStoreConfig, LogFilter, LogLevel, Logger, LoggerConfig};
//!
//! # async fn run() -> ulog::Result<()> {
//! let store = FileStore::new(FileStoreConfig::new("./logs").with_max_files(3));
//! let logger = Logger::new(store, LoggerConfig::new("checkout").with_environment("production"));
//! logger.init().await?;
//!
//! logger.info("order placed", None).await;
//!
//! let _recent = logger
//!     .query(&LogFilter::new().with_levels([LogLevel::Warn, LogLevel::Error]).with_limit(20))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod console;
pub mod error;
pub mod file_store;
pub mod format;
pub mod level;
pub mod logger;
pub mod memory_store;
pub mod redact;
pub mod rotation;
pub mod traits;
pub mod types;

// Re-export main types
pub use analysis::{ErrorAnalysis, LogStats};
pub use console::{init_subscriber, ConsoleSink, TracingConsole};
pub use error::{LogError, Result};
pub use file_store::{FileStore, FileStoreConfig};
pub use format::LogFormat;
pub use level::LevelFilter;
pub use logger::{Delivery, Logger, LoggerConfig, WriteFailure};
pub use memory_store::MemoryStore;
pub use redact::{Redactor, REDACTION_MARKER};
pub use rotation::RotationManager;
pub use traits::LogBackend;
pub use types::{ErrorDetail, LogContext, LogFilter, LogLevel, LogRecord};
