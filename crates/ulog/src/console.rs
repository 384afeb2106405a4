//! Console mirroring of accepted records.
//!
//! This module provides the [`ConsoleSink`] trait and the default
//! [`TracingConsole`] implementation, which forwards each record to the
//! `tracing` infrastructure at a matching level:
//! - Error → `tracing::error!`
//! - Warn → `tracing::warn!`
//! - Info, Debug, Trace → `tracing::info!`

use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{LogError, Result};
use crate::format::format_timestamp;
use crate::types::{LogLevel, LogRecord};

/// Destination for console-mirrored records.
pub trait ConsoleSink: Send + Sync {
    /// Emits one record.
    fn emit(&self, record: &LogRecord);
}

/// Renders the console form of a record:
/// `[LEVEL] timestamp [service] message {context}` plus the error message on
/// a new line.
#[must_use]
pub fn console_line(record: &LogRecord) -> String {
    let mut parts = vec![
        format!("[{}]", record.level.as_str().to_uppercase()),
        format_timestamp(&record.timestamp),
        format!("[{}]", record.service),
        record.message.clone(),
    ];

    if let Some(context) = record.context.as_ref().filter(|c| !c.is_empty()) {
        parts.push(serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string()));
    }

    if let Some(ref err) = record.error {
        parts.push(format!("\n  error: {}", err.message));
    }

    parts.join(" ")
}

/// Console sink that uses the `tracing` infrastructure.
#[derive(Debug, Clone, Default)]
pub struct TracingConsole {
    /// Also emit error stacks.
    show_stacks: bool,
}

impl TracingConsole {
    /// Creates a console sink that omits stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console sink that also prints error stacks.
    #[must_use]
    pub const fn with_stacks(show_stacks: bool) -> Self {
        Self { show_stacks }
    }
}

impl ConsoleSink for TracingConsole {
    fn emit(&self, record: &LogRecord) {
        let line = console_line(record);
        let level = record.level;
        let service = record.service.as_str();

        match level {
            LogLevel::Error => error!(target: "ulog::console", %level, service, "{line}"),
            LogLevel::Warn => warn!(target: "ulog::console", %level, service, "{line}"),
            LogLevel::Info | LogLevel::Debug | LogLevel::Trace => {
                info!(target: "ulog::console", %level, service, "{line}");
            }
        }

        if self.show_stacks {
            if let Some(stack) = record.error.as_ref().and_then(|e| e.stack.as_deref()) {
                error!(target: "ulog::console", service, "{stack}");
            }
        }
    }
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back
/// to `default_directive` (e.g. `"ulog=info"`).
///
/// # Errors
///
/// Returns [`LogError::InvalidConfig`] if the directive does not parse or a
/// global subscriber is already installed.
pub fn init_subscriber(default_directive: &str) -> Result<()> {
    let directive: Directive = default_directive
        .parse()
        .map_err(|e| LogError::InvalidConfig(format!("tracing directive: {e}")))?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| LogError::InvalidConfig(format!("tracing subscriber: {e}")))
}
