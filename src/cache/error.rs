//! Error types for the response cache.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by explicit cache operations.
///
/// [`ResponseCache::get_or_fetch`](super::ResponseCache::get_or_fetch) never
/// returns these; it logs them and falls back to fetching.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading, writing or removing a cache file failed.
    #[error("cache IO error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Entry metadata could not be serialized.
    #[error("failed to encode cache metadata for {path}: {source}")]
    Encode {
        /// Metadata file being written.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a metadata encoding error.
    pub fn encode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Encode {
            path: path.into(),
            source,
        }
    }
}
