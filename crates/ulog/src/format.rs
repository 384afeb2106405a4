//! Line encodings for stored records.
//!
//! Two formats are supported:
//! - [`LogFormat::Json`] — one JSON object per line, lossless
//! - [`LogFormat::Text`] — `[timestamp] [LEVEL] [service] message ...`, lossy
//!
//! The text format is read back best-effort: only the timestamp, level,
//! service and the remainder of the line are recovered. Context and error
//! details stay inside the message text, environment becomes
//! [`UNKNOWN_ENVIRONMENT`], and continuation lines produced by multi-line
//! error output do not parse on their own and are skipped by readers.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::types::{LogLevel, LogRecord};

/// Environment assigned to records recovered from the text format.
pub const UNKNOWN_ENVIRONMENT: &str = "unknown";

/// Three bracketed groups followed by free text.
static TEXT_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(.*?)\] \[(.*?)\] \[(.*?)\] (.*)").unwrap_or_else(|_| unreachable!())
});

/// On-disk encoding of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable bracketed line.
    Text,
}

impl LogFormat {
    /// Encodes a record as a single logical line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(self, record: &LogRecord) -> Result<String> {
        match self {
            Self::Json => Ok(serde_json::to_string(record)?),
            Self::Text => encode_text(record),
        }
    }

    /// Parses one stored line back into a record.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Parse`] if the line does not have the expected shape.
    pub fn decode(self, line: &str) -> Result<LogRecord> {
        match self {
            Self::Json => serde_json::from_str(line).map_err(|e| LogError::Parse(e.to_string())),
            Self::Text => decode_text(line),
        }
    }
}

/// Renders a timestamp as RFC 3339 with millisecond precision.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn encode_text(record: &LogRecord) -> Result<String> {
    let mut parts = vec![
        format!("[{}]", format_timestamp(&record.timestamp)),
        format!("[{}]", record.level.as_str().to_uppercase()),
        format!("[{}]", record.service),
        record.message.clone(),
    ];

    if let Some(context) = record.context.as_ref().filter(|c| !c.is_empty()) {
        parts.push(serde_json::to_string(context)?);
    }

    if let Some(ref error) = record.error {
        parts.push(format!("\nError: {}", error.message));
        if let Some(ref stack) = error.stack {
            parts.push(format!("\n{stack}"));
        }
    }

    Ok(parts.join(" "))
}

fn decode_text(line: &str) -> Result<LogRecord> {
    let captures = TEXT_LINE_REGEX
        .captures(line)
        .ok_or_else(|| LogError::Parse("line does not match text layout".to_string()))?;

    let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

    let timestamp = DateTime::parse_from_rfc3339(group(1))
        .map_err(|e| LogError::Parse(format!("invalid timestamp: {e}")))?
        .with_timezone(&Utc);
    let level: LogLevel = group(2).parse()?;

    Ok(LogRecord::new(
        level,
        group(4),
        timestamp,
        UNKNOWN_ENVIRONMENT,
        group(3),
    ))
}
