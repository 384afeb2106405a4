//! Bounded in-memory log storage.
//!
//! [`MemoryStore`] keeps the most recent records in insertion order and
//! answers queries with the same semantics as the file store. It is useful
//! for embedded use and as a test backend for the [`Logger`](crate::Logger).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{LogError, Result};
use crate::traits::LogBackend;
use crate::types::{LogFilter, LogRecord};

/// Default number of records retained.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Thread-safe in-memory log store.
pub struct MemoryStore {
    max_entries: usize,
    /// Records, oldest first
    records: RwLock<VecDeque<LogRecord>>,
    /// Whether the store is accepting reads and writes
    open: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryStore {
    /// Creates a store that retains at most `max_entries` records.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            records: RwLock::new(VecDeque::new()),
            open: AtomicBool::new(false),
        }
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LogError::Closed)
        }
    }
}

impl LogBackend for MemoryStore {
    async fn connect(&self) -> Result<()> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn write(&self, record: &LogRecord) -> Result<()> {
        self.ensure_open()?;

        let mut records = self.records.write();
        records.push_back(record.clone());
        while records.len() > self.max_entries {
            records.pop_front();
        }
        Ok(())
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogRecord>> {
        self.ensure_open()?;

        let matching = self
            .records
            .read()
            .iter()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect();
        Ok(filter.paginate(matching))
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }
}
