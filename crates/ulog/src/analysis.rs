//! Aggregations over queried records.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LogLevel, LogRecord, USER_ID_KEY};

/// Record counts per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// Total records counted
    pub total: usize,
    /// Error records
    pub error: usize,
    /// Warn records
    pub warn: usize,
    /// Info records
    pub info: usize,
    /// Debug records
    pub debug: usize,
    /// Trace records
    pub trace: usize,
}

impl LogStats {
    /// Returns the count for one level.
    #[must_use]
    pub const fn count(&self, level: LogLevel) -> usize {
        match level {
            LogLevel::Error => self.error,
            LogLevel::Warn => self.warn,
            LogLevel::Info => self.info,
            LogLevel::Debug => self.debug,
            LogLevel::Trace => self.trace,
        }
    }
}

/// One group of error records sharing a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    /// Error message (or record message when no error is attached)
    pub message: String,
    /// Number of occurrences
    pub count: usize,
    /// Earliest occurrence
    pub first_occurrence: DateTime<Utc>,
    /// Latest occurrence
    pub last_occurrence: DateTime<Utc>,
    /// Distinct `userId` context values seen
    pub affected_users: usize,
}

/// Counts records per level.
#[must_use]
pub fn stats(records: &[LogRecord]) -> LogStats {
    records.iter().fold(LogStats::default(), |mut acc, record| {
        acc.total += 1;
        match record.level {
            LogLevel::Error => acc.error += 1,
            LogLevel::Warn => acc.warn += 1,
            LogLevel::Info => acc.info += 1,
            LogLevel::Debug => acc.debug += 1,
            LogLevel::Trace => acc.trace += 1,
        }
        acc
    })
}

/// Groups error-level records by message, most frequent first.
///
/// Groups with equal counts are ordered by most recent occurrence.
#[must_use]
pub fn error_analysis(records: &[LogRecord]) -> Vec<ErrorAnalysis> {
    struct Group<'a> {
        count: usize,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        users: HashSet<&'a str>,
    }

    let mut groups: HashMap<&str, Group<'_>> = HashMap::new();
    for record in records.iter().filter(|r| r.level == LogLevel::Error) {
        let message = record
            .error
            .as_ref()
            .map_or(record.message.as_str(), |e| e.message.as_str());

        let group = groups.entry(message).or_insert_with(|| Group {
            count: 0,
            first: record.timestamp,
            last: record.timestamp,
            users: HashSet::new(),
        });
        group.count += 1;
        group.first = group.first.min(record.timestamp);
        group.last = group.last.max(record.timestamp);
        if let Some(user) = record.context_str(USER_ID_KEY) {
            group.users.insert(user);
        }
    }

    let mut analysis: Vec<ErrorAnalysis> = groups
        .into_iter()
        .map(|(message, group)| ErrorAnalysis {
            message: message.to_string(),
            count: group.count,
            first_occurrence: group.first,
            last_occurrence: group.last,
            affected_users: group.users.len(),
        })
        .collect();
    analysis.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_occurrence.cmp(&a.last_occurrence))
    });
    analysis
}
