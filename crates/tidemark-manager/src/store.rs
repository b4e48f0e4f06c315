//! File-backed frontier persistence.
//!
//! The frontier is stored as a single pretty-printed JSON document:
//! ```text
//! {
//!   "generation": 4,
//!   "saved_at": "2024-01-15T10:00:00Z",
//!   "bookmarks": ["FB:kcwQ...", "FB:kcwQ..."],
//!   "digest": "9f2c..."
//! }
//! ```
//!
//! The digest is checked on load so a hand-edited or truncated file is
//! refused rather than silently seeding a wrong frontier.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use tidemark_core::{BookmarksUpdated, Frontier};

use crate::observer::BookmarkObserver;

/// Errors that can occur during frontier storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Integrity check failed for {0}: stored digest does not match bookmarks")]
    IntegrityViolation(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The on-disk document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontierRecord {
    pub generation: u64,
    pub saved_at: DateTime<Utc>,
    pub bookmarks: Frontier,
    pub digest: String,
}

impl FrontierRecord {
    pub fn from_event(event: &BookmarksUpdated) -> Self {
        Self {
            generation: event.generation,
            saved_at: Utc::now(),
            digest: event.bookmarks.digest(),
            bookmarks: event.bookmarks.clone(),
        }
    }

    pub fn verify_integrity(&self) -> bool {
        self.digest == self.bookmarks.digest()
    }
}

struct StoreInner {
    path: PathBuf,
    /// Generation of the last record this handle wrote.
    last_written: Mutex<u64>,
}

/// Frontier persisted to a JSON file.
///
/// Acts as a seed supplier and as an update observer, so one store can
/// carry a frontier across process restarts. Clones share state.
#[derive(Clone)]
pub struct FileBookmarkStore {
    inner: Arc<StoreInner>,
}

impl FileBookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                last_written: Mutex::new(0),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Read the stored record, if the file exists.
    pub fn load_record(&self) -> Result<Option<FrontierRecord>, StoreError> {
        let json = match fs::read_to_string(&self.inner.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: FrontierRecord = serde_json::from_str(&json)?;
        if !record.verify_integrity() {
            return Err(StoreError::IntegrityViolation(self.inner.path.clone()));
        }
        Ok(Some(record))
    }

    /// Read the stored frontier. A missing file is an empty frontier.
    pub fn load(&self) -> Result<Frontier, StoreError> {
        Ok(self
            .load_record()?
            .map(|record| record.bookmarks)
            .unwrap_or_default())
    }

    /// Persist the frontier carried by `event`.
    ///
    /// Returns `false` without writing if this handle already wrote a
    /// newer generation.
    pub fn save(&self, event: &BookmarksUpdated) -> Result<bool, StoreError> {
        let mut last_written = self.inner.last_written.lock();
        if event.generation < *last_written {
            tracing::debug!(
                generation = event.generation,
                last_written = *last_written,
                "Skipping stale frontier write"
            );
            return Ok(false);
        }

        let path = &self.inner.path;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let record = FrontierRecord::from_event(event);
        let json = serde_json::to_string_pretty(&record)?;

        let tmp = tmp_path(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        *last_written = event.generation;

        tracing::debug!(
            generation = event.generation,
            path = %path.display(),
            digest = %record.digest,
            "Frontier saved"
        );
        Ok(true)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl BookmarkObserver for FileBookmarkStore {
    fn bookmarks_updated(&self, event: &BookmarksUpdated) {
        if let Err(e) = self.save(event) {
            tracing::warn!(
                path = %self.inner.path.display(),
                generation = event.generation,
                error = %e,
                "Failed to persist bookmarks"
            );
        }
    }
}
