//! On-disk entry format.
//!
//! Each entry is a pair of files named after the SHA-256 of its key:
//! `<hash>.body` holds the raw payload and `<hash>.meta.json` holds the key,
//! timestamp, and payload length and digest. An entry is only valid when the
//! metadata matches the body byte for byte.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::CacheError;

pub(super) const META_SUFFIX: &str = ".meta.json";
pub(super) const BODY_SUFFIX: &str = ".body";

/// Metadata stored next to every cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct EntryMeta {
    pub key: String,
    pub stored_at_ms: u64,
    pub payload_len: u64,
    pub payload_sha256: String,
}

impl EntryMeta {
    pub fn new(key: &str, payload: &[u8], stored_at: SystemTime) -> Self {
        Self {
            key: key.to_string(),
            stored_at_ms: to_unix_millis(stored_at),
            payload_len: payload.len() as u64,
            payload_sha256: sha256_hex(payload),
        }
    }

    pub fn stored_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.stored_at_ms)
    }

    /// True once the entry is older than `max_age`. Entries stamped in the
    /// future count as fresh.
    pub fn is_stale(&self, now: SystemTime, max_age: Duration) -> bool {
        let age_ms = to_unix_millis(now).saturating_sub(self.stored_at_ms);
        u128::from(age_ms) > max_age.as_millis()
    }

    pub fn matches_body(&self, body: &[u8]) -> bool {
        self.payload_len == body.len() as u64 && self.payload_sha256 == sha256_hex(body)
    }
}

/// Paths of the two files backing one key.
#[derive(Debug, Clone)]
pub(super) struct EntryPaths {
    pub meta: PathBuf,
    pub body: PathBuf,
}

impl EntryPaths {
    pub fn for_key(dir: &Path, key: &str) -> Self {
        Self::for_stem(dir, &sha256_hex(key.as_bytes()))
    }

    pub fn for_stem(dir: &Path, stem: &str) -> Self {
        Self {
            meta: dir.join(format!("{stem}{META_SUFFIX}")),
            body: dir.join(format!("{stem}{BODY_SUFFIX}")),
        }
    }

    /// Removes both files, ignoring ones that are already gone.
    pub fn remove(&self) -> Result<(), CacheError> {
        remove_if_exists(&self.body)?;
        remove_if_exists(&self.meta)
    }
}

pub(super) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn to_unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(super) fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Writes `content` to `path` through a temp file in the same directory and
/// a rename, so readers see either the old or the new file.
pub(super) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| CacheError::io(temp_file.path().to_path_buf(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_meta_staleness_boundary() {
        let stored_at = UNIX_EPOCH + Duration::from_secs(1_000);
        let meta = EntryMeta::new("k", b"payload", stored_at);
        let max_age = Duration::from_secs(60);

        assert!(!meta.is_stale(stored_at + Duration::from_secs(60), max_age));
        assert!(meta.is_stale(stored_at + Duration::from_secs(61), max_age));
    }

    #[test]
    fn test_entry_meta_future_timestamp_is_fresh() {
        let stored_at = UNIX_EPOCH + Duration::from_secs(5_000);
        let meta = EntryMeta::new("k", b"payload", stored_at);
        assert!(!meta.is_stale(UNIX_EPOCH + Duration::from_secs(10), Duration::ZERO));
    }

    #[test]
    fn test_entry_meta_matches_body() {
        let meta = EntryMeta::new("k", b"payload", SystemTime::now());
        assert!(meta.matches_body(b"payload"));
        assert!(!meta.matches_body(b"payloaX"));
        assert!(!meta.matches_body(b"pay"));
    }

    #[test]
    fn test_entry_paths_are_stable_per_key() {
        let dir = Path::new("/cache/requests");
        let a = EntryPaths::for_key(dir, "https://optica.example.com/roles");
        let b = EntryPaths::for_key(dir, "https://optica.example.com/roles");
        let c = EntryPaths::for_key(dir, "https://optica.example.com/");
        assert_eq!(a.meta, b.meta);
        assert_ne!(a.meta, c.meta);
        assert!(a.meta.to_string_lossy().ends_with(META_SUFFIX));
        assert!(a.body.to_string_lossy().ends_with(BODY_SUFFIX));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
