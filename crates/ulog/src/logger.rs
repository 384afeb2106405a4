//! The logging facade.
//!
//! [`Logger`] gates each call on the minimum level, redacts the context,
//! stamps the record, mirrors it to the console and hands it to the
//! configured [`LogBackend`]. Backend failures never escape a logging call:
//! they are reported through `tracing` and published as [`WriteFailure`]
//! events, and the call returns [`Delivery::Failed`].

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::error;

use crate::analysis::{self, ErrorAnalysis, LogStats};
use crate::console::{ConsoleSink, TracingConsole};
use crate::error::Result;
use crate::level::LevelFilter;
use crate::redact::{Redactor, DEFAULT_SENSITIVE_PATTERNS};
use crate::traits::LogBackend;
use crate::types::{ErrorDetail, LogContext, LogFilter, LogLevel, LogRecord};

/// Environment in which error stacks are mirrored to the console.
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// Buffered failure events per subscriber.
const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// Configuration for the logging facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Deployment environment stamped on every record.
    pub environment: String,
    /// Service name stamped on every record.
    pub service: String,
    /// Mirror accepted records to the console sink.
    pub enable_console: bool,
    /// Records below this level are dropped.
    pub min_level: LogLevel,
    /// Apply context redaction.
    pub sanitize: bool,
    /// Case-insensitive substrings marking a context key as sensitive.
    pub sanitize_patterns: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            environment: DEVELOPMENT_ENVIRONMENT.to_string(),
            service: "app".to_string(),
            enable_console: true,
            min_level: LogLevel::Info,
            sanitize: true,
            sanitize_patterns: DEFAULT_SENSITIVE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl LoggerConfig {
    /// Creates a config for the given service with default settings.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Enables or disables console mirroring.
    #[must_use]
    pub const fn with_console(mut self, enabled: bool) -> Self {
        self.enable_console = enabled;
        self
    }

    /// Sets the minimum level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Enables or disables redaction.
    #[must_use]
    pub const fn with_sanitize(mut self, enabled: bool) -> Self {
        self.sanitize = enabled;
        self
    }

    /// Replaces the sensitive key patterns.
    #[must_use]
    pub fn with_sanitize_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sanitize_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    fn redactor(&self) -> Redactor {
        if self.sanitize {
            Redactor::new(&self.sanitize_patterns)
        } else {
            Redactor::disabled()
        }
    }
}

/// Outcome of a single logging call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Below the minimum level; nothing was done.
    Skipped,
    /// The backend accepted the record.
    Stored,
    /// The backend rejected the record; the reason was reported.
    Failed(String),
}

impl Delivery {
    /// Returns true if the record reached the backend.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// A record that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Level of the lost record
    pub level: LogLevel,
    /// Message of the lost record
    pub message: String,
    /// Backend error text
    pub error: String,
    /// When the failure was observed
    pub at: DateTime<Utc>,
}

/// Structured logging facade over a storage backend.
pub struct Logger<B> {
    backend: B,
    config: LoggerConfig,
    level_filter: LevelFilter,
    redactor: Redactor,
    console: Box<dyn ConsoleSink>,
    failures: broadcast::Sender<WriteFailure>,
}

impl<B: LogBackend> Logger<B> {
    /// Creates a logger. Call [`init`](Self::init) before logging.
    #[must_use]
    pub fn new(backend: B, config: LoggerConfig) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let show_stacks = config.environment == DEVELOPMENT_ENVIRONMENT;

        Self {
            backend,
            level_filter: LevelFilter::new(config.min_level),
            redactor: config.redactor(),
            config,
            console: Box::new(TracingConsole::with_stacks(show_stacks)),
            failures,
        }
    }

    /// Replaces the console sink.
    #[must_use]
    pub fn with_console_sink(mut self, sink: impl ConsoleSink + 'static) -> Self {
        self.console = Box::new(sink);
        self
    }

    /// Connects the backend.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Connection`](crate::LogError::Connection) if the
    /// backend cannot be made ready.
    pub async fn init(&self) -> Result<()> {
        self.backend.connect().await
    }

    /// Logs a record at the given level.
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorDetail>,
    ) -> Delivery {
        if !self.level_filter.accepts(level) {
            return Delivery::Skipped;
        }

        let record = LogRecord {
            level,
            message: message.into(),
            context: context.map(|c| self.redactor.redact(&c)),
            timestamp: Utc::now().trunc_subsecs(3),
            environment: self.config.environment.clone(),
            service: self.config.service.clone(),
            error,
        };

        if self.config.enable_console {
            self.console.emit(&record);
        }

        match self.backend.write(&record).await {
            Ok(()) => Delivery::Stored,
            Err(e) => {
                let reason = e.to_string();
                error!(
                    target: "ulog",
                    level = %record.level,
                    error = %reason,
                    "failed to write log record"
                );
                let _ = self.failures.send(WriteFailure {
                    level: record.level,
                    message: record.message,
                    error: reason.clone(),
                    at: Utc::now(),
                });
                Delivery::Failed(reason)
            }
        }
    }

    /// Logs at trace level.
    pub async fn trace(&self, message: impl Into<String>, context: Option<LogContext>) -> Delivery {
        self.log(LogLevel::Trace, message, context, None).await
    }

    /// Logs at debug level.
    pub async fn debug(&self, message: impl Into<String>, context: Option<LogContext>) -> Delivery {
        self.log(LogLevel::Debug, message, context, None).await
    }

    /// Logs at info level.
    pub async fn info(&self, message: impl Into<String>, context: Option<LogContext>) -> Delivery {
        self.log(LogLevel::Info, message, context, None).await
    }

    /// Logs at warn level.
    pub async fn warn(&self, message: impl Into<String>, context: Option<LogContext>) -> Delivery {
        self.log(LogLevel::Warn, message, context, None).await
    }

    /// Logs at error level with optional error detail.
    pub async fn error(
        &self,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorDetail>,
    ) -> Delivery {
        self.log(LogLevel::Error, message, context, error).await
    }

    /// Logs at error level, capturing an error value.
    pub async fn error_with<E>(
        &self,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: &E,
    ) -> Delivery
    where
        E: std::error::Error + 'static,
    {
        let detail = ErrorDetail::from_error(error);
        self.log(LogLevel::Error, message, context, Some(detail)).await
    }

    /// Queries the backend.
    ///
    /// # Errors
    ///
    /// Propagates backend query errors.
    pub async fn query(&self, filter: &LogFilter) -> Result<Vec<LogRecord>> {
        self.backend.query(filter).await
    }

    /// Counts records per level among those matching the filter.
    ///
    /// # Errors
    ///
    /// Propagates backend query errors.
    pub async fn stats(&self, filter: &LogFilter) -> Result<LogStats> {
        let records = self.backend.query(filter).await?;
        Ok(analysis::stats(&records))
    }

    /// Groups error records matching the filter by message.
    ///
    /// # Errors
    ///
    /// Propagates backend query errors.
    pub async fn error_analysis(&self, filter: &LogFilter) -> Result<Vec<ErrorAnalysis>> {
        let filter = filter.clone().with_level(LogLevel::Error);
        let records = self.backend.query(&filter).await?;
        Ok(analysis::error_analysis(&records))
    }

    /// Closes the backend.
    ///
    /// # Errors
    ///
    /// Propagates backend close errors.
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    /// Subscribes to write failures that occur after this call.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<WriteFailure> {
        self.failures.subscribe()
    }

    /// Returns the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LoggerConfig {
        &self.config
    }
}
