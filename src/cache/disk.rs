//! Disk-backed persistent cache tier.
//!
//! One JSON record per key at `<dir>/<hex-digest>.json`, wrapped in an
//! envelope carrying `created_at`/`expires_at`. Writes go to a temp file in
//! the same directory and are renamed over the destination, so a reader
//! never observes a truncated record. Corrupt or expired records are purged
//! on observation and reported as misses; persistence is best-effort and
//! never fails the caller.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::entry::now_secs;
use super::key::CacheKey;
use crate::error::{CacheError, Result};
use crate::model::CachedResponse;

const RECORD_EXT: &str = "json";

/// Envelope persisted for each cached response.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    data: CachedResponse,
    created_at: u64,
    expires_at: u64,
}

/// Counters and occupancy for the disk tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskStats {
    pub enabled: bool,
    pub records: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Durable key-to-response store surviving process restarts.
///
/// Unbounded by count; records are bounded in time by `default_ttl_secs`.
/// When disabled, every operation is a no-op returning absent/0.
pub struct DiskCache {
    dir: PathBuf,
    default_ttl_secs: u64,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DiskCache {
    /// Create the tier rooted at `dir`.
    ///
    /// When enabled, the directory is created and probed for writability;
    /// an unusable directory is a [`CacheError::Config`] here and never a
    /// deferred runtime failure.
    pub fn new(dir: PathBuf, default_ttl_secs: u64, enabled: bool) -> Result<Self> {
        if enabled {
            fs::create_dir_all(&dir).map_err(|e| {
                CacheError::Config(format!(
                    "cannot create disk cache directory {}: {e}",
                    dir.display()
                ))
            })?;
            // Probe: an unwritable directory should fail now, not on first set.
            NamedTempFile::new_in(&dir).map_err(|e| {
                CacheError::Config(format!(
                    "disk cache directory {} is not writable: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(Self {
            dir,
            default_ttl_secs,
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Read a record. Expired and corrupt records are deleted and reported
    /// as misses.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }
        let path = self.record_path(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!(key = %key.log_prefix(), "Failed to read disk cache record: {e}");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        let record: DiskRecord = match serde_json::from_str(&data) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key.log_prefix(), "Corrupt disk cache record, purging: {e}");
                let _ = fs::remove_file(&path);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if now_secs() > record.expires_at {
            debug!(key = %key.log_prefix(), "Disk cache record expired, removing");
            let _ = fs::remove_file(&path);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(record.data)
    }

    /// Write a record durably. Returns whether the write happened.
    ///
    /// Failures are logged and reported as `false`, never propagated; the
    /// memory tier (and the caller's own computation) remain the source of
    /// truth.
    pub fn set(&self, key: &CacheKey, value: &CachedResponse, ttl_secs: Option<u64>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.write_record(key, value, ttl_secs) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key.log_prefix(), "Failed to write disk cache record: {e}");
                false
            }
        }
    }

    fn write_record(
        &self,
        key: &CacheKey,
        value: &CachedResponse,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let now = now_secs();
        let record = DiskRecord {
            data: value.clone(),
            created_at: now,
            expires_at: now.saturating_add(ttl_secs.unwrap_or(self.default_ttl_secs)),
        };
        let encoded = serde_json::to_vec(&record)?;
        // Temp file lives in the cache directory so persist() is a
        // same-filesystem rename, atomic from the reader's perspective.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&encoded)?;
        tmp.persist(self.record_path(key))
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    /// Delete a record if present. Idempotent.
    pub fn delete(&self, key: &CacheKey) -> bool {
        if !self.enabled {
            return false;
        }
        fs::remove_file(self.record_path(key)).is_ok()
    }

    /// Scan the directory and delete every lapsed or unreadable record,
    /// returning the count removed.
    pub fn cleanup_expired(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let now = now_secs();
        let mut removed = 0;
        for path in self.record_paths() {
            // Unreadable or corrupt records are reclaimed too.
            let stale = match fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str::<DiskRecord>(&data) {
                    Ok(record) => now > record.expires_at,
                    Err(_) => true,
                },
                Err(_) => true,
            };
            if stale && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "Swept expired disk cache records");
        }
        removed
    }

    /// Remove all records unconditionally.
    pub fn clear(&self) {
        if !self.enabled {
            return;
        }
        for path in self.record_paths() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove disk cache record {}: {e}", path.display());
            }
        }
    }

    /// Number of records currently on disk (expired-but-unswept included).
    pub fn record_count(&self) -> usize {
        self.record_paths().len()
    }

    pub fn stats(&self) -> DiskStats {
        DiskStats {
            enabled: self.enabled,
            records: self.record_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXT}", key.as_hex()))
    }

    fn record_paths(&self) -> Vec<PathBuf> {
        if !self.enabled {
            return Vec::new();
        }
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == RECORD_EXT))
            .collect()
    }

    /// Write a record whose TTL already lapsed, bypassing `set`.
    #[cfg(test)]
    pub(crate) fn insert_expired(&self, key: &CacheKey, value: &CachedResponse) {
        let record = DiskRecord {
            data: value.clone(),
            created_at: now_secs().saturating_sub(120),
            expires_at: now_secs().saturating_sub(60),
        };
        let encoded = serde_json::to_vec(&record).unwrap();
        fs::write(self.record_path(key), encoded).unwrap();
    }

    #[cfg(test)]
    pub(crate) fn record_path_for(&self, key: &CacheKey) -> PathBuf {
        self.record_path(key)
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("dir", &self.dir)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("enabled", &self.enabled)
            .finish()
    }
}
