//! Minimum-severity gate applied before any work is done for a log call.

use serde::{Deserialize, Serialize};

use crate::types::LogLevel;

/// Accepts records whose priority is at or above a configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelFilter {
    min_level: LogLevel,
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LevelFilter {
    /// Creates a filter with the given minimum level.
    #[must_use]
    pub const fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    /// Returns the configured minimum level.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Returns true if a record at `level` should proceed.
    #[must_use]
    pub const fn accepts(&self, level: LogLevel) -> bool {
        level.is_at_least(self.min_level)
    }
}
