//! Core types for the structured logging facade.
//!
//! This module provides:
//! - [`LogLevel`] — Ordered severity levels
//! - [`LogRecord`] — One normalized log event
//! - [`ErrorDetail`] — Error information attached to a record
//! - [`LogFilter`] — Query filters shared by every backend

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Context key matched by [`LogFilter::user_id`].
pub const USER_ID_KEY: &str = "userId";
/// Context key matched by [`LogFilter::request_id`].
pub const REQUEST_ID_KEY: &str = "requestId";
/// Context key matched by [`LogFilter::session_id`].
pub const SESSION_ID_KEY: &str = "sessionId";

/// Open mapping of contextual attributes attached to a record.
pub type LogContext = HashMap<String, serde_json::Value>;

/// Log severity levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information
    Trace = 0,
    /// Debugging information
    Debug = 1,
    /// General information
    Info = 2,
    /// Warning conditions
    Warn = 3,
    /// Error conditions
    Error = 4,
}

impl LogLevel {
    /// All levels, least severe first.
    pub const ALL: [Self; 5] = [Self::Trace, Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Returns the integer priority of this level (trace=0 … error=4).
    #[must_use]
    pub const fn priority(self) -> u8 {
        self as u8
    }

    /// Returns true if this level is at least as severe as the given level.
    #[must_use]
    pub const fn is_at_least(self, level: Self) -> bool {
        self.priority() >= level.priority()
    }

    /// Returns the lowercase string representation of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LogError::Parse(format!("unknown level: {other}"))),
        }
    }
}

/// Error information captured alongside a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// The error message
    pub message: String,
    /// Rendered stack or cause chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Application-specific error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Kind name of the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ErrorDetail {
    /// Creates an error detail carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            code: None,
            name: None,
        }
    }

    /// Captures an error value.
    ///
    /// The name is the error's type name. Everything else comes from
    /// [`from_dyn_error`](Self::from_dyn_error).
    #[must_use]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let name = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            name: Some(name),
            ..Self::from_dyn_error(error)
        }
    }

    /// Captures a type-erased error value.
    ///
    /// The message is the error's `Display` output and the stack is the
    /// rendered `source()` chain if any. The code comes from the first
    /// [`std::io::Error`] in the chain: its OS error number when it has one,
    /// its [`ErrorKind`](std::io::ErrorKind) otherwise.
    #[must_use]
    pub fn from_dyn_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let chain = || std::iter::successors(Some(error), |e| e.source());

        let causes: Vec<String> = chain()
            .skip(1)
            .map(|cause| format!("caused by: {cause}"))
            .collect();

        let code = chain()
            .find_map(|e| e.downcast_ref::<std::io::Error>())
            .map(|io| {
                io.raw_os_error()
                    .map_or_else(|| format!("{:?}", io.kind()), |errno| errno.to_string())
            });

        Self {
            message: error.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
            code,
            name: None,
        }
    }

    /// Sets the stack text.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the error kind name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One normalized log event.
///
/// Records are immutable once built by the dispatcher. `context: None` and
/// `context: Some(empty)` are distinct and both survive the structured format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Severity level
    pub level: LogLevel,
    /// The log message
    pub message: String,
    /// Contextual attributes, already redacted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
    /// When the record was created
    pub timestamp: DateTime<Utc>,
    /// Deployment environment (e.g. `production`)
    pub environment: String,
    /// Emitting service name
    pub service: String,
    /// Attached error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl LogRecord {
    /// Creates a record with no context and no error.
    #[must_use]
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        environment: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            context: None,
            timestamp,
            environment: environment.into(),
            service: service.into(),
            error: None,
        }
    }

    /// Attaches a context mapping.
    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches an error.
    #[must_use]
    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns a context value if it is a string.
    #[must_use]
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.as_ref()?.get(key)?.as_str()
    }

    /// Checks if this record matches the given filter.
    ///
    /// Pagination fields of the filter are ignored here.
    #[must_use]
    pub fn matches(&self, filter: &LogFilter) -> bool {
        if filter.level.is_some_and(|level| level != self.level) {
            return false;
        }

        if !filter.levels.is_empty() && !filter.levels.contains(&self.level) {
            return false;
        }

        let identifiers = [
            (USER_ID_KEY, &filter.user_id),
            (REQUEST_ID_KEY, &filter.request_id),
            (SESSION_ID_KEY, &filter.session_id),
        ];
        for (key, wanted) in identifiers {
            if let Some(wanted) = wanted.as_deref().filter(|w| !w.is_empty()) {
                if self.context_str(key) != Some(wanted) {
                    return false;
                }
            }
        }

        if filter.start_date.is_some_and(|start| self.timestamp < start) {
            return false;
        }
        if filter.end_date.is_some_and(|end| self.timestamp > end) {
            return false;
        }

        if let Some(search) = filter.search_text.as_deref().filter(|s| !s.is_empty()) {
            let search_lower = search.to_lowercase();
            let in_message = self.message.to_lowercase().contains(&search_lower);
            let in_error = self
                .error
                .as_ref()
                .is_some_and(|e| e.message.to_lowercase().contains(&search_lower));
            if !in_message && !in_error {
                return false;
            }
        }

        true
    }
}

/// Filter criteria for querying logs.
///
/// Every backend applies the same semantics: exact context matches,
/// inclusive date bounds, case-insensitive substring search over message and
/// error message, newest-first ordering, then `offset`/`limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogFilter {
    /// Exact level match
    pub level: Option<LogLevel>,
    /// Set of accepted levels.
    ///
    /// An empty set places no level constraint, so a serialized
    /// `"levels": []` matches every level rather than none. Use
    /// [`level`](Self::level) or a non-empty set to narrow results.
    pub levels: Vec<LogLevel>,
    /// Exact match against the `userId` context field
    pub user_id: Option<String>,
    /// Exact match against the `requestId` context field
    pub request_id: Option<String>,
    /// Exact match against the `sessionId` context field
    pub session_id: Option<String>,
    /// Inclusive lower timestamp bound
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring of message or error message
    pub search_text: Option<String>,
    /// Maximum number of results (`None` or 0 means all)
    pub limit: Option<usize>,
    /// Number of results to skip after sorting
    pub offset: Option<usize>,
}

impl LogFilter {
    /// Creates a new empty filter that matches all logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to exactly one level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Restricts results to a set of levels.
    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = LogLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    /// Adds a user ID filter.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds a request ID filter.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Adds a session ID filter.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Adds an inclusive time window.
    #[must_use]
    pub const fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Adds a text search filter.
    #[must_use]
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of results to skip.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sorts records newest first, then applies offset and limit.
    #[must_use]
    pub fn paginate(&self, mut records: Vec<LogRecord>) -> Vec<LogRecord> {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.filter(|&l| l > 0).unwrap_or(usize::MAX);
        records.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use test_case::test_case;

    fn make_record(level: LogLevel, message: &str) -> LogRecord {
        LogRecord::new(level, message, Utc::now(), "test", "svc")
    }

    fn with_user(record: LogRecord, user: &str) -> LogRecord {
        let mut context = LogContext::new();
        context.insert(USER_ID_KEY.to_string(), json!(user));
        record.with_context(context)
    }

    // ===========================================
    // LogLevel Tests
    // ===========================================

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test_case(LogLevel::Trace, 0 ; "trace")]
    #[test_case(LogLevel::Debug, 1 ; "debug")]
    #[test_case(LogLevel::Info, 2 ; "info")]
    #[test_case(LogLevel::Warn, 3 ; "warn")]
    #[test_case(LogLevel::Error, 4 ; "error")]
    fn log_level_priority(level: LogLevel, priority: u8) {
        assert_eq!(level.priority(), priority);
    }

    #[test_case("INFO", LogLevel::Info ; "uppercase")]
    #[test_case("warn", LogLevel::Warn ; "lowercase")]
    #[test_case("Error", LogLevel::Error ; "mixed case")]
    fn log_level_parses_case_insensitively(input: &str, expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn log_level_rejects_unknown() {
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_level_serialization() {
        let json = serde_json::to_string(&LogLevel::Info).map_err(|e| format!("serialize: {e}"));
        assert_eq!(json, Ok("\"info\"".to_string()));
    }

    // ===========================================
    // ErrorDetail Tests
    // ===========================================

    #[test]
    fn error_detail_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let detail = ErrorDetail::from_error(&io_err);

        assert_eq!(detail.message, "disk on fire");
        assert_eq!(detail.name.as_deref(), Some("Error"));
        assert_eq!(detail.code.as_deref(), Some("Other"));
    }

    #[test]
    fn error_detail_code_prefers_os_error_number() {
        let io_err = std::io::Error::from_raw_os_error(2);
        let detail = ErrorDetail::from_error(&io_err);
        assert_eq!(detail.code.as_deref(), Some("2"));
    }

    #[test]
    fn error_detail_code_found_through_source_chain() {
        let outer = LogError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let detail = ErrorDetail::from_error(&outer);
        assert_eq!(detail.code.as_deref(), Some("NotFound"));
    }

    #[test]
    fn error_detail_code_absent_without_io_error() {
        let detail = ErrorDetail::from_error(&LogError::Closed);
        assert!(detail.code.is_none());
    }

    #[test]
    fn error_detail_from_boxed_error() {
        let boxed: Box<dyn std::error::Error> = "plain failure".into();
        let detail = ErrorDetail::from_dyn_error(&*boxed);
        assert_eq!(detail.message, "plain failure");
        assert!(detail.name.is_none());
        assert!(detail.code.is_none());
    }

    #[test]
    fn error_detail_renders_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let outer = LogError::Io(inner);
        let detail = ErrorDetail::from_error(&outer);

        assert_eq!(detail.name.as_deref(), Some("LogError"));
        assert_eq!(detail.stack.as_deref(), Some("caused by: missing"));
    }

    // ===========================================
    // Filter Tests
    // ===========================================

    #[test]
    fn empty_filter_matches_everything() {
        let filter = LogFilter::new();
        for level in LogLevel::ALL {
            assert!(make_record(level, "x").matches(&filter));
        }
    }

    #[test]
    fn filter_by_single_level() {
        let filter = LogFilter::new().with_level(LogLevel::Warn);
        assert!(make_record(LogLevel::Warn, "x").matches(&filter));
        assert!(!make_record(LogLevel::Error, "x").matches(&filter));
    }

    #[test]
    fn filter_by_level_set() {
        let filter = LogFilter::new().with_levels([LogLevel::Warn, LogLevel::Error]);
        assert!(make_record(LogLevel::Warn, "x").matches(&filter));
        assert!(make_record(LogLevel::Error, "x").matches(&filter));
        assert!(!make_record(LogLevel::Info, "x").matches(&filter));
    }

    #[test]
    fn filter_by_user_requires_exact_string() {
        let filter = LogFilter::new().with_user_id("u1");

        assert!(with_user(make_record(LogLevel::Info, "x"), "u1").matches(&filter));
        assert!(!with_user(make_record(LogLevel::Info, "x"), "u10").matches(&filter));
        assert!(!make_record(LogLevel::Info, "x").matches(&filter));

        let mut numeric = LogContext::new();
        numeric.insert(USER_ID_KEY.to_string(), json!(1));
        assert!(!make_record(LogLevel::Info, "x").with_context(numeric).matches(&filter));
    }

    #[test]
    fn empty_identifier_is_ignored() {
        let filter = LogFilter::new().with_request_id("");
        assert!(make_record(LogLevel::Info, "x").matches(&filter));
    }

    #[test]
    fn filter_time_bounds_are_inclusive() {
        let now = Utc::now();
        let record = LogRecord::new(LogLevel::Info, "x", now, "test", "svc");

        let exact = LogFilter::new().with_time_range(Some(now), Some(now));
        assert!(record.matches(&exact));

        let after = LogFilter::new().with_time_range(Some(now + Duration::milliseconds(1)), None);
        assert!(!record.matches(&after));

        let before = LogFilter::new().with_time_range(None, Some(now - Duration::milliseconds(1)));
        assert!(!record.matches(&before));
    }

    #[test]
    fn search_text_checks_message_and_error() {
        let filter = LogFilter::new().with_search_text("TIMEOUT");

        assert!(make_record(LogLevel::Info, "request timeout").matches(&filter));

        let with_error = make_record(LogLevel::Error, "request failed")
            .with_error(ErrorDetail::new("upstream Timeout after 30s"));
        assert!(with_error.matches(&filter));

        assert!(!make_record(LogLevel::Info, "all good").matches(&filter));
    }

    #[test]
    fn paginate_sorts_newest_first_then_slices() {
        let base = Utc::now();
        let records: Vec<LogRecord> = (0..5)
            .map(|i| {
                LogRecord::new(
                    LogLevel::Info,
                    format!("m{i}"),
                    base + Duration::seconds(i),
                    "test",
                    "svc",
                )
            })
            .collect();

        let page = LogFilter::new().with_offset(1).with_limit(2).paginate(records.clone());
        let messages: Vec<&str> = page.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["m3", "m2"]);

        let all = LogFilter::new().with_limit(0).paginate(records);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn filter_deserializes_camel_case() {
        let filter: Result<LogFilter, _> = serde_json::from_value(json!({
            "levels": ["warn", "error"],
            "userId": "u1",
            "limit": 10
        }));
        let filter = filter.map_err(|e| e.to_string());
        assert_eq!(
            filter,
            Ok(LogFilter::new()
                .with_levels([LogLevel::Warn, LogLevel::Error])
                .with_user_id("u1")
                .with_limit(10))
        );
    }

    #[test]
    fn explicit_empty_levels_place_no_constraint() {
        let filter: Result<LogFilter, _> = serde_json::from_value(json!({ "levels": [] }));
        let filter = filter.map_err(|e| e.to_string());
        assert_eq!(filter, Ok(LogFilter::new()));
        if let Ok(filter) = filter {
            assert!(LogLevel::ALL.iter().all(|&l| make_record(l, "x").matches(&filter)));
        }
    }
}
