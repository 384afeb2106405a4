//! File-based log storage with rotation support.
//!
//! This module provides:
//! - [`FileStore`] — Append-only storage in a single active file plus
//!   numbered rotated siblings
//! - [`FileStoreConfig`] — Directory, naming, rotation and format settings
//! - Implementation of [`LogBackend`]
//!
//! One `FileStore` serializes its own write-and-rotate sequence, but nothing
//! coordinates separate stores or processes pointed at the same directory.
//! Such writers can corrupt the rotation chain. A query that runs during a
//! rotation may observe a file mid-move.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::error::{LogError, Result};
use crate::format::LogFormat;
use crate::rotation::{split_filename, RotationManager};
use crate::traits::LogBackend;
use crate::types::{LogFilter, LogRecord};

/// Configuration for file-based log storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Directory holding the active and rotated files.
    pub log_dir: PathBuf,
    /// Name of the active file, e.g. `app.log`.
    pub filename: String,
    /// Size in bytes at which the active file is rotated.
    pub max_size: u64,
    /// Number of rotated files to retain.
    pub max_files: usize,
    /// Whether size-triggered rotation is performed.
    pub enable_rotation: bool,
    /// On-disk record encoding.
    pub format: LogFormat,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            filename: "app.log".to_string(),
            max_size: 10 * 1024 * 1024, // 10 MB
            max_files: 5,
            enable_rotation: true,
            format: LogFormat::Json,
        }
    }
}

impl FileStoreConfig {
    /// Creates a new config with the given log directory.
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Default::default()
        }
    }

    /// Sets the active file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Sets the max file size for rotation.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the number of rotated files to retain.
    #[must_use]
    pub const fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Enables or disables rotation.
    #[must_use]
    pub const fn with_rotation(mut self, enabled: bool) -> Self {
        self.enable_rotation = enabled;
        self
    }

    /// Sets the on-disk format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Checks that the configuration can describe a valid file set.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] for an empty filename, a filename
    /// with an empty stem (such as `.log`), or a zero size or file limit.
    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(LogError::InvalidConfig("filename must not be empty".to_string()));
        }
        // The stem is the prefix that claims sibling files.
        if split_filename(&self.filename).0.trim().is_empty() {
            return Err(LogError::InvalidConfig(format!(
                "filename {:?} has an empty stem",
                self.filename
            )));
        }
        if self.max_size == 0 {
            return Err(LogError::InvalidConfig("max_size must be positive".to_string()));
        }
        if self.max_files == 0 {
            return Err(LogError::InvalidConfig("max_files must be positive".to_string()));
        }
        Ok(())
    }
}

/// File-based log storage with rotation.
pub struct FileStore {
    config: FileStoreConfig,
    rotation: RotationManager,
    /// Serializes rotate-then-append within this store.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a new file store. No file system access happens until
    /// [`connect`](LogBackend::connect).
    #[must_use]
    pub fn new(config: FileStoreConfig) -> Self {
        let rotation = RotationManager::new(
            config.log_dir.clone(),
            &config.filename,
            config.max_size,
            config.max_files,
        );
        Self {
            config,
            rotation,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a file store with default settings in the given directory.
    #[must_use]
    pub fn with_log_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStoreConfig::new(log_dir))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Returns the path of the active log file.
    #[must_use]
    pub fn log_file_path(&self) -> &Path {
        self.rotation.active_path()
    }

    /// Lists every file belonging to this log (active and rotated), sorted
    /// by name.
    ///
    /// Any non-directory entry (regular file or symlink) whose name starts
    /// with the configured filename minus its extension is included.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Query`] if the directory cannot be listed.
    pub async fn files(&self) -> Result<Vec<PathBuf>> {
        let (prefix, _) = split_filename(&self.config.filename);
        let mut entries = fs::read_dir(&self.config.log_dir)
            .await
            .map_err(|e| LogError::Query(format!("{}: {e}", self.config.log_dir.display())))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LogError::Query(e.to_string()))?
        {
            let is_file = entry.file_type().await.is_ok_and(|t| !t.is_dir());
            if is_file && entry.file_name().to_string_lossy().starts_with(prefix) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Deletes the active file and all rotated files.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or a file cannot be
    /// deleted.
    pub async fn clear_logs(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut removed = 0;
        for path in self.files().await? {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Rotates the active file immediately, regardless of its size.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Rotation`] if moving files fails.
    pub async fn rotate_now(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.rotation.rotate().await
    }

    /// Appends one encoded line to the active file.
    async fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file_path())
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Reads one file and collects the records that match the filter.
    async fn read_matching(&self, path: &Path, filter: &LogFilter, results: &mut Vec<LogRecord>) {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "ulog", path = %path.display(), error = %e, "skipping unreadable log file");
                return;
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match self.config.format.decode(line) {
                Ok(record) if record.matches(filter) => results.push(record),
                Ok(_) => {}
                Err(e) => {
                    trace!(target: "ulog", path = %path.display(), error = %e, "skipping malformed line");
                }
            }
        }
    }
}

impl LogBackend for FileStore {
    async fn connect(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| LogError::Connection(e.to_string()))?;

        fs::create_dir_all(&self.config.log_dir).await.map_err(|e| {
            LogError::Connection(format!(
                "cannot create {}: {e}",
                self.config.log_dir.display()
            ))
        })
    }

    async fn write(&self, record: &LogRecord) -> Result<()> {
        let line = self
            .config
            .format
            .encode(record)
            .map_err(|e| LogError::Write(e.to_string()))?;

        let _guard = self.write_lock.lock().await;

        if self.config.enable_rotation {
            if let Err(e) = self.rotation.rotate_if_needed().await {
                warn!(target: "ulog", error = %e, "rotation failed, appending to current file");
            }
        }

        self.append_line(&line).await.map_err(|e| {
            LogError::Write(format!("{}: {e}", self.log_file_path().display()))
        })
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogRecord>> {
        let files = match self.files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(target: "ulog", error = %e, "cannot list log directory");
                return Ok(Vec::new());
            }
        };

        let mut results = Vec::new();
        for path in &files {
            self.read_matching(path, filter, &mut results).await;
        }

        Ok(filter.paginate(results))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorDetail, LogContext, LogLevel};
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn make_record(level: LogLevel, message: &str, at: DateTime<Utc>) -> LogRecord {
        LogRecord::new(level, message, at, "test", "svc")
    }

    async fn make_temp_store(config: impl FnOnce(FileStoreConfig) -> FileStoreConfig) -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(config(FileStoreConfig::new(temp_dir.path())));
        store.connect().await.expect("connect");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn connect_creates_directory() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("nested/logs");
        let store = FileStore::with_log_dir(&path);

        assert!(store.connect().await.is_ok());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = FileStore::new(FileStoreConfig::new(temp_dir.path()).with_max_files(0));

        let result = store.connect().await;
        assert!(matches!(result, Err(LogError::Connection(_))));
    }

    #[tokio::test]
    async fn empty_stem_is_refused_and_leaves_neighbours_alone() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let neighbour = temp_dir.path().join("unrelated.db");
        std::fs::write(&neighbour, b"keep me").expect("seed neighbour");
        let store = FileStore::new(FileStoreConfig::new(temp_dir.path()).with_filename(".log"));

        let result = store.connect().await;
        assert!(matches!(result, Err(LogError::Connection(_))));
        assert!(neighbour.exists());
    }

    #[tokio::test]
    async fn write_appends_one_line_per_record() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let now = Utc::now();

        store.write(&make_record(LogLevel::Info, "one", now)).await.expect("write");
        store.write(&make_record(LogLevel::Info, "two", now)).await.expect("write");

        let content = std::fs::read_to_string(store.log_file_path()).expect("read");
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn query_returns_newest_first() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let base = Utc::now();

        for (i, message) in ["first", "second", "third"].iter().enumerate() {
            let at = base + Duration::seconds(i as i64);
            store.write(&make_record(LogLevel::Info, message, at)).await.expect("write");
        }

        let results = store.query(&LogFilter::default()).await.expect("query");
        let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn query_with_filter() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let now = Utc::now();

        store.write(&make_record(LogLevel::Info, "info message", now)).await.expect("write");
        store.write(&make_record(LogLevel::Error, "error message", now)).await.expect("write");
        store.write(&make_record(LogLevel::Warn, "warn message", now)).await.expect("write");

        let results = store
            .query(&LogFilter::new().with_level(LogLevel::Error))
            .await
            .expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn query_empty_directory_returns_empty() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let results = store.query(&LogFilter::default()).await.expect("query");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn query_missing_directory_returns_empty() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = FileStore::with_log_dir(temp_dir.path().join("never-created"));
        let results = store.query(&LogFilter::default()).await.expect("query");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn write_without_directory_fails_as_write_error() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = FileStore::with_log_dir(temp_dir.path().join("never-created"));
        let result = store.write(&make_record(LogLevel::Info, "lost", Utc::now())).await;
        assert!(matches!(result, Err(LogError::Write(_))));
    }

    #[tokio::test]
    async fn query_skips_malformed_lines() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let now = Utc::now();

        store.write(&make_record(LogLevel::Info, "before", now)).await.expect("write");
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.log_file_path())
            .await
            .expect("open");
        file.write_all(b"%%% not a record %%%\n\n").await.expect("inject");
        drop(file);
        store.write(&make_record(LogLevel::Info, "after", now)).await.expect("write");

        let results = store.query(&LogFilter::default()).await.expect("query");
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn rotates_on_size() {
        let (store, dir) = make_temp_store(|c| c.with_max_size(100).with_max_files(2)).await;

        for i in 0..20 {
            let message = format!("message {i} with some extra text to make it bigger");
            store.write(&make_record(LogLevel::Info, &message, Utc::now())).await.expect("write");
        }

        let files = store.files().await.expect("files");
        assert!(files.len() <= 3);
        assert!(dir.path().join("app.1.log").exists());
        assert!(dir.path().join("app.2.log").exists());
        assert!(!dir.path().join("app.3.log").exists());
    }

    #[tokio::test]
    async fn rotation_disabled_keeps_single_file() {
        let (store, _dir) = make_temp_store(|c| c.with_max_size(10).with_rotation(false)).await;

        for i in 0..5 {
            store
                .write(&make_record(LogLevel::Info, &format!("m{i}"), Utc::now()))
                .await
                .expect("write");
        }

        assert_eq!(store.files().await.expect("files").len(), 1);
    }

    #[tokio::test]
    async fn query_reads_rotated_files() {
        let (store, _dir) = make_temp_store(|c| c).await;
        let base = Utc::now();

        store.write(&make_record(LogLevel::Info, "before rotation", base)).await.expect("write");
        store.rotate_now().await.expect("rotate");
        let later = base + Duration::seconds(1);
        store.write(&make_record(LogLevel::Info, "after rotation", later)).await.expect("write");

        assert_eq!(store.files().await.expect("files").len(), 2);
        let results = store.query(&LogFilter::default()).await.expect("query");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].message, "after rotation");
    }

    #[tokio::test]
    async fn text_format_roundtrip_is_lossy() {
        let (store, _dir) = make_temp_store(|c| c.with_format(LogFormat::Text)).await;
        let mut context = LogContext::new();
        context.insert("userId".to_string(), json!("u1"));
        let record = make_record(LogLevel::Error, "payment failed", Utc::now())
            .with_context(context)
            .with_error(ErrorDetail::new("card declined").with_stack("at charge\nat checkout"));

        store.write(&record).await.expect("write");

        let results = store.query(&LogFilter::default()).await.expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].level, LogLevel::Error);
        assert!(results[0].message.starts_with("payment failed"));
        assert!(results[0].context.is_none());
        assert!(results[0].error.is_none());
    }

    #[tokio::test]
    async fn clear_logs_removes_all_files() {
        let (store, _dir) = make_temp_store(|c| c).await;

        store.write(&make_record(LogLevel::Info, "a", Utc::now())).await.expect("write");
        store.rotate_now().await.expect("rotate");
        store.write(&make_record(LogLevel::Info, "b", Utc::now())).await.expect("write");

        assert_eq!(store.clear_logs().await.expect("clear"), 2);
        assert!(store.files().await.expect("files").is_empty());
        assert!(store.query(&LogFilter::default()).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn files_match_by_stem_prefix() {
        let (store, dir) = make_temp_store(|c| c).await;
        std::fs::write(dir.path().join("other.log"), "x").expect("write");
        store.write(&make_record(LogLevel::Info, "a", Utc::now())).await.expect("write");

        let files = store.files().await.expect("files");
        assert_eq!(files, vec![dir.path().join("app.log")]);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = FileStoreConfig::new(temp_dir.path());

        {
            let store = FileStore::new(config.clone());
            store.connect().await.expect("connect");
            store.write(&make_record(LogLevel::Info, "persisted", Utc::now())).await.expect("write");
            store.close().await.expect("close");
        }

        let store = FileStore::new(config);
        store.connect().await.expect("reconnect");
        let results = store.query(&LogFilter::default()).await.expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "persisted");
    }

    #[test]
    fn config_defaults() {
        let config = FileStoreConfig::default();
        assert_eq!(config.log_dir, PathBuf::from("./logs"));
        assert_eq!(config.filename, "app.log");
        assert_eq!(config.max_size, 10 * 1024 * 1024);
        assert_eq!(config.max_files, 5);
        assert!(config.enable_rotation);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn config_builder() {
        let config = FileStoreConfig::new("/var/log/app")
            .with_filename("service.txt")
            .with_max_size(5 * 1024 * 1024)
            .with_max_files(3)
            .with_rotation(false)
            .with_format(LogFormat::Text);

        assert_eq!(config.log_dir, PathBuf::from("/var/log/app"));
        assert_eq!(config.filename, "service.txt");
        assert_eq!(config.max_size, 5 * 1024 * 1024);
        assert_eq!(config.max_files, 3);
        assert!(!config.enable_rotation);
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: std::result::Result<FileStoreConfig, _> =
            serde_json::from_value(json!({ "log_dir": "/tmp/x", "format": "text" }));
        let config = config.expect("deserialize");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.max_files, 5);
    }

    #[test]
    fn config_validation() {
        assert!(FileStoreConfig::default().validate().is_ok());
        assert!(FileStoreConfig::default().with_filename(" ").validate().is_err());
        assert!(FileStoreConfig::default().with_filename(".log").validate().is_err());
        assert!(FileStoreConfig::default().with_filename(".txt").validate().is_err());
        assert!(FileStoreConfig::default().with_filename("app").validate().is_ok());
        assert!(FileStoreConfig::default().with_max_size(0).validate().is_err());
        assert!(FileStoreConfig::default().with_max_files(0).validate().is_err());
    }
}
