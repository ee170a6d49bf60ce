//! Time-bounded on-disk cache of service responses.
//!
//! Responses are keyed by the exact request URI and stay fresh for
//! [`DEFAULT_MAX_AGE`] unless another window is configured. Stale entries are
//! removed when they are next looked up, by [`ResponseCache::purge_expired`],
//! or all at once by [`ResponseCache::clear_all`].
//!
//! The cache directory is shared by every invocation and is not locked. Two
//! processes that miss on the same key both fetch, and the last writer's
//! entry wins. Files are written through a temp file and rename, so a reader
//! never sees a half-written file; an entry whose body and metadata disagree
//! is treated as absent and deleted.
//!
//! # Example
//!
//! ```no_run
//! use optical_core::cache::ResponseCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ResponseCache::new("/tmp/optical-cache");
//! let body = cache
//!     .get_or_fetch("https://optica.example.com/roles", || async {
//!         Ok::<_, std::io::Error>(b"{\"nodes\":{}}".to_vec())
//!     })
//!     .await?;
//! assert_eq!(body, b"{\"nodes\":{}}");
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;

pub use error::CacheError;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use entry::{BODY_SUFFIX, EntryMeta, EntryPaths, META_SUFFIX, atomic_write, remove_if_exists};

/// Default freshness window (15 minutes).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(15 * 60);

/// Subdirectory of the cache root holding request entries.
const REQUESTS_DIR: &str = "requests";

/// A cached response as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Rendered request URI.
    pub key: String,
    /// Response body.
    pub payload: Vec<u8>,
    /// When the response was stored.
    pub stored_at: SystemTime,
}

/// File-backed response cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
    max_age: Duration,
}

impl ResponseCache {
    /// Creates a cache with the default 15-minute window.
    ///
    /// Nothing is created on disk until the first store.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_max_age(root, DEFAULT_MAX_AGE)
    }

    /// Creates a cache with a custom freshness window.
    #[must_use]
    pub fn with_max_age(root: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            root: root.into(),
            max_age,
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Freshness window applied to every entry.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn requests_dir(&self) -> PathBuf {
        self.root.join(REQUESTS_DIR)
    }

    /// Returns the cached payload for `key`, or awaits `fetch` exactly once
    /// and stores its result.
    ///
    /// Cache IO problems are logged and treated as a miss; a failed store does
    /// not affect the returned payload.
    ///
    /// # Errors
    ///
    /// Returns the error from `fetch` unchanged. Nothing is stored in that
    /// case.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        match self.lookup(key) {
            Ok(Some(payload)) => {
                debug!(key, bytes = payload.len(), "cache hit");
                return Ok(payload);
            }
            Ok(None) => debug!(key, "cache miss"),
            Err(error) => warn!(key, %error, "cache lookup failed; fetching directly"),
        }

        let payload = fetch().await?;

        if let Err(error) = self.store(key, &payload) {
            warn!(key, %error, "failed to store response in cache");
        }
        Ok(payload)
    }

    /// Returns the fresh payload for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when an existing entry cannot be read or a
    /// stale or corrupt one cannot be removed.
    pub fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.load(key)?.map(|entry| entry.payload))
    }

    /// Returns the fresh entry for `key`, if any.
    ///
    /// # Errors
    ///
    /// Same as [`lookup`](Self::lookup).
    pub fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let paths = EntryPaths::for_key(&self.requests_dir(), key);

        let Some(raw_meta) = read_optional(&paths.meta)? else {
            return Ok(None);
        };
        let meta: EntryMeta = match serde_json::from_slice(&raw_meta) {
            Ok(meta) => meta,
            Err(error) => {
                warn!(path = %paths.meta.display(), %error, "discarding unreadable cache entry");
                paths.remove()?;
                return Ok(None);
            }
        };

        if meta.key != key {
            debug!(key, stored_key = %meta.key, "cache entry belongs to another key");
            return Ok(None);
        }

        if meta.is_stale(SystemTime::now(), self.max_age) {
            debug!(key, "removing stale cache entry");
            paths.remove()?;
            return Ok(None);
        }

        let Some(payload) = read_optional(&paths.body)? else {
            debug!(key, "cache entry has no body; removing");
            paths.remove()?;
            return Ok(None);
        };
        if !meta.matches_body(&payload) {
            warn!(key, "cache entry body does not match its metadata; removing");
            paths.remove()?;
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            key: meta.key.clone(),
            payload,
            stored_at: meta.stored_at(),
        }))
    }

    /// Stores `payload` under `key`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache directory or entry files cannot
    /// be written.
    pub fn store(&self, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.store_at(key, payload, SystemTime::now())
    }

    fn store_at(&self, key: &str, payload: &[u8], stored_at: SystemTime) -> Result<(), CacheError> {
        let dir = self.requests_dir();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let paths = EntryPaths::for_key(&dir, key);
        let meta = EntryMeta::new(key, payload, stored_at);
        let encoded = serde_json::to_vec(&meta).map_err(|e| CacheError::encode(&paths.meta, e))?;

        // Body first: a meta file only ever points at a complete body.
        atomic_write(&paths.body, payload)?;
        atomic_write(&paths.meta, &encoded)?;
        debug!(key, bytes = payload.len(), "stored response in cache");
        Ok(())
    }

    /// Removes the entry for `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when an existing file cannot be removed.
    pub fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        EntryPaths::for_key(&self.requests_dir(), key).remove()
    }

    /// Deletes every entry older than the freshness window, plus unreadable
    /// entries and bodies without metadata. Returns the number of entries
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache directory cannot be listed or a
    /// file cannot be removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let dir = self.requests_dir();
        let listing = match std::fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(&dir, e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for dir_entry in listing {
            let dir_entry = dir_entry.map_err(|e| CacheError::io(&dir, e))?;
            let file_name = dir_entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if let Some(stem) = name.strip_suffix(META_SUFFIX) {
                let paths = EntryPaths::for_stem(&dir, stem);
                let expired = match read_optional(&paths.meta)? {
                    Some(raw) => serde_json::from_slice::<EntryMeta>(&raw)
                        .map_or(true, |meta| meta.is_stale(now, self.max_age)),
                    None => false,
                };
                if expired {
                    paths.remove()?;
                    removed += 1;
                }
            } else if let Some(stem) = name.strip_suffix(BODY_SUFFIX) {
                let paths = EntryPaths::for_stem(&dir, stem);
                if !paths.meta.exists() {
                    remove_if_exists(&paths.body)?;
                }
            }
        }

        if removed > 0 {
            info!(removed, "purged expired cache entries");
        }
        Ok(removed)
    }

    /// Deletes every entry, fresh or not.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache directory cannot be removed.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        let dir = self.requests_dir();
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(dir = %dir.display(), "cleared response cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&dir, e)),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
