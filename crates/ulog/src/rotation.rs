//! Size-triggered rotation of the active log file.
//!
//! Rotated files are named `name.N.ext`, where `N = 1` is the most recently
//! rotated file and `N = max_files` the oldest. Rotating:
//!
//! 1. deletes `name.{max_files}.ext` if present,
//! 2. for `i` from `max_files - 1` down to 1, appends `name.i.ext` onto
//!    `name.{i+1}.ext` and deletes the source,
//! 3. appends the active file onto `name.1.ext` and deletes the active file.
//!
//! Files are moved with append-then-delete, not rename. A crash between the
//! append and the delete of a step leaves the segment in both files; a crash
//! during the append can lose its tail. Nothing here repairs that.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{LogError, Result};

/// Extension used when the configured filename has none.
pub const DEFAULT_EXTENSION: &str = "log";

/// Splits a filename into its stem and final extension.
///
/// `app.log` becomes `("app", "log")`; `app` becomes `("app", "log")`.
#[must_use]
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        Some((stem, _)) => (stem, DEFAULT_EXTENSION),
        None => (filename, DEFAULT_EXTENSION),
    }
}

/// Decides when to rotate and shifts the numbered backup chain.
#[derive(Debug, Clone)]
pub struct RotationManager {
    dir: PathBuf,
    active: PathBuf,
    stem: String,
    ext: String,
    max_size: u64,
    max_files: usize,
}

impl RotationManager {
    /// Creates a rotation manager for `dir/filename`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, filename: &str, max_size: u64, max_files: usize) -> Self {
        let dir = dir.into();
        let (stem, ext) = split_filename(filename);
        Self {
            active: dir.join(filename),
            stem: stem.to_string(),
            ext: ext.to_string(),
            dir,
            max_size,
            max_files,
        }
    }

    /// Path of the active file.
    #[must_use]
    pub fn active_path(&self) -> &Path {
        &self.active
    }

    /// Path of the rotated file at `index` (1-based).
    #[must_use]
    pub fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{index}.{}", self.stem, self.ext))
    }

    /// Rotates if the active file exists and has reached the size limit.
    ///
    /// Returns true if a rotation happened.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Rotation`] if inspecting or moving files fails.
    pub async fn rotate_if_needed(&self) -> Result<bool> {
        let size = match fs::metadata(&self.active).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(rotation_error("inspect", &self.active, &e)),
        };

        if size < self.max_size {
            return Ok(false);
        }

        self.rotate().await?;
        Ok(true)
    }

    /// Shifts the backup chain and retires the active file to index 1.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Rotation`] on the first file operation that fails;
    /// earlier steps are not undone.
    pub async fn rotate(&self) -> Result<()> {
        let oldest = self.rotated_path(self.max_files);
        remove_if_exists(&oldest).await?;

        for index in (1..self.max_files).rev() {
            let from = self.rotated_path(index);
            if fs::try_exists(&from).await.unwrap_or(false) {
                move_by_append(&from, &self.rotated_path(index + 1)).await?;
            }
        }

        if fs::try_exists(&self.active).await.unwrap_or(false) {
            move_by_append(&self.active, &self.rotated_path(1)).await?;
        }

        debug!(
            target: "ulog",
            active = %self.active.display(),
            max_files = self.max_files,
            "rotated log file"
        );
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(rotation_error("delete", path, &e)),
    }
}

/// Appends `from` onto `to` (creating it if needed), then deletes `from`.
async fn move_by_append(from: &Path, to: &Path) -> Result<()> {
    let content = fs::read(from)
        .await
        .map_err(|e| rotation_error("read", from, &e))?;

    let mut target = OpenOptions::new()
        .create(true)
        .append(true)
        .open(to)
        .await
        .map_err(|e| rotation_error("open", to, &e))?;
    target
        .write_all(&content)
        .await
        .map_err(|e| rotation_error("append to", to, &e))?;
    target
        .flush()
        .await
        .map_err(|e| rotation_error("flush", to, &e))?;
    drop(target);

    fs::remove_file(from)
        .await
        .map_err(|e| rotation_error("delete", from, &e))
}

fn rotation_error(action: &str, path: &Path, err: &std::io::Error) -> LogError {
    LogError::Rotation(format!("{action} {}: {err}", path.display()))
}
