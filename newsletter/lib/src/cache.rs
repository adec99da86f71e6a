//! Content-addressed cache for generated summaries.
//!
//! Summaries are expensive to produce, so each one is stored under the xxh3
//! fingerprint of the text it was generated from. Unchanged release notes are
//! never summarised twice.
//!
//! Each entry is a JSON file named `<fingerprint>.json` inside the cache
//! directory.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use newsletter_lib::cache::{CacheError, SummaryCache};
//!
//! # async fn example() -> Result<(), CacheError> {
//! let cache = SummaryCache::new("/tmp/newsletter-cache");
//! let summary = cache
//!     .get_or_compute("- Add offline mode", |text| async move {
//!         Ok::<_, CacheError>(format!("Summary of: {text}"))
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Errors that can occur while reading or writing the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialised
    #[error("Cache entry serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    created_at: DateTime<Utc>,
    summary: String,
}

/// Returns the 16-hex-digit xxh3 fingerprint of `content`.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::cache::fingerprint;
///
/// let key = fingerprint("hello");
/// assert_eq!(key.len(), 16);
/// assert_eq!(key, fingerprint("hello"));
/// assert_ne!(key, fingerprint("hello!"));
/// ```
pub fn fingerprint(content: &str) -> String {
    format!("{:016x}", xxh3_64(content.as_bytes()))
}

/// On-disk summary cache keyed by content fingerprint.
#[derive(Debug, Clone)]
pub struct SummaryCache {
    dir: Option<PathBuf>,
}

impl SummaryCache {
    /// Creates a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Creates a cache that never stores anything.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Returns the cache directory, if caching is enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }

    /// Looks up a summary by fingerprint.
    ///
    /// A missing or unreadable entry is a miss, not an error.
    pub async fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key)?;
        let raw = fs::read_to_string(&path).await.ok()?;

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry.summary),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Stores a summary under `key`, replacing any existing entry.
    ///
    /// ## Errors
    ///
    /// Returns `CacheError::Io` if the directory or file cannot be written.
    pub async fn put(&self, key: &str, summary: &str) -> Result<(), CacheError> {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(key)) else {
            return Ok(());
        };

        fs::create_dir_all(dir).await?;
        let entry = CacheEntry {
            fingerprint: key.to_string(),
            created_at: Utc::now(),
            summary: summary.to_string(),
        };
        fs::write(&path, serde_json::to_string_pretty(&entry)?).await?;
        Ok(())
    }

    /// Returns the cached summary for `content`, or computes, stores, and returns it.
    ///
    /// A failed computation is returned as-is and nothing is stored. A failed
    /// write is logged and the computed summary is still returned.
    ///
    /// ## Errors
    ///
    /// Propagates the error from `compute`.
    pub async fn get_or_compute<F, Fut, E>(&self, content: &str, compute: F) -> Result<String, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let key = fingerprint(content);

        if let Some(summary) = self.get(&key).await {
            debug!(%key, "Summary cache hit");
            return Ok(summary);
        }

        debug!(%key, "Summary cache miss");
        let summary = compute(content.to_string()).await?;
        if let Err(e) = self.put(&key, &summary).await {
            warn!(%key, error = %e, "Failed to store summary in cache");
        }
        Ok(summary)
    }
}
