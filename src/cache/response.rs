//! Tiered response cache: bounded memory tier over a durable disk tier.
//!
//! Lookup order is memory, then disk; disk hits are promoted into memory.
//! Writes go to both tiers (dual-write), but the tiers are allowed to
//! diverge: disk is a best-effort durability layer, not a transactional
//! partner. Memory operations run inline and never block on I/O; disk
//! operations are dispatched through `spawn_blocking` so filesystem latency
//! cannot stall concurrent async work.
//!
//! There is no ambient global instance. The composition root constructs one
//! `ResponseCache` and hands it to whichever component performs generation
//! calls; the call site probes `get`, performs the real computation on a
//! miss, then stores the result with `set`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::disk::{DiskCache, DiskStats};
use super::key::CacheKey;
use super::store::{BoundedCache, StoreStats};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::model::{CachedResponse, CompletionRequest};

/// Combined per-tier and aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub memory: StoreStats,
    pub disk: DiskStats,
    /// Hits over lookups across both tiers; 0.0 when nothing was looked up.
    pub hit_rate: f64,
}

/// Two-tier cache for deterministic completion responses.
pub struct ResponseCache {
    enabled: bool,
    memory: BoundedCache<CacheKey, CachedResponse>,
    disk: Arc<DiskCache>,
}

impl ResponseCache {
    /// Build the cache from already-validated configuration.
    ///
    /// Fails on zero memory capacity or an unusable disk directory. A
    /// disabled cache constructs successfully, no-ops every operation, and
    /// never touches the filesystem.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = BoundedCache::new(
            config.max_memory_entries,
            config.memory_ttl_secs,
            config.policy,
        )?;
        let disk = DiskCache::new(
            config.resolve_disk_dir(),
            config.disk_ttl_secs,
            config.enabled && config.disk_enabled,
        )?;
        Ok(Self {
            enabled: config.enabled,
            memory,
            disk: Arc::new(disk),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a cached response for a request.
    ///
    /// Returns `None` immediately for ineligible (non-deterministic)
    /// requests. A disk hit is promoted into the memory tier (subject to
    /// memory's own eviction) before being returned.
    pub async fn get(&self, request: &CompletionRequest) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }
        let key = CacheKey::derive(request)?;

        if let Some(value) = self.memory.get(&key) {
            debug!(key = %key.log_prefix(), "Memory cache hit");
            return Some(value);
        }

        if !self.disk.enabled() {
            return None;
        }
        let disk = Arc::clone(&self.disk);
        let probe = key.clone();
        let found = match tokio::task::spawn_blocking(move || disk.get(&probe)).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Disk cache lookup task failed: {e}");
                None
            }
        };
        let value = found?;

        debug!(key = %key.log_prefix(), "Disk cache hit, promoting to memory");
        self.memory.set(key, value.clone(), None);
        Some(value)
    }

    /// Store a response in both tiers.
    ///
    /// Returns whether the write was performed (`false` for ineligible
    /// requests or a disabled cache). A failed disk write is logged and
    /// does not roll back the memory write.
    pub async fn set(&self, request: &CompletionRequest, response: CachedResponse) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(key) = CacheKey::derive(request) else {
            debug!("Request is non-deterministic, skipping cache write");
            return false;
        };

        self.memory.set(key.clone(), response.clone(), None);

        if self.disk.enabled() {
            let disk = Arc::clone(&self.disk);
            let record_key = key.clone();
            match tokio::task::spawn_blocking(move || disk.set(&record_key, &response, None)).await
            {
                Ok(true) => {}
                // The disk tier already logged the write failure; the memory
                // entry stands and the tiers reconverge on the next set.
                Ok(false) => {}
                Err(e) => warn!("Disk cache write task failed: {e}"),
            }
        }

        debug!(key = %key.log_prefix(), "Cached response");
        true
    }

    /// Sweep expired entries in both tiers.
    ///
    /// Counts are reported per tier: the tiers carry different TTLs and are
    /// not expected to expire in lockstep.
    pub async fn cleanup(&self) -> (usize, usize) {
        let memory_removed = self.memory.cleanup_expired();
        let disk = Arc::clone(&self.disk);
        let disk_removed = match tokio::task::spawn_blocking(move || disk.cleanup_expired()).await
        {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Disk cache cleanup task failed: {e}");
                0
            }
        };
        info!(memory_removed, disk_removed, "Cache cleanup complete");
        (memory_removed, disk_removed)
    }

    /// Clear both tiers unconditionally.
    pub async fn clear(&self) {
        self.memory.clear();
        let disk = Arc::clone(&self.disk);
        if let Err(e) = tokio::task::spawn_blocking(move || disk.clear()).await {
            warn!("Disk cache clear task failed: {e}");
        }
        info!("Cleared all cache tiers");
    }

    /// Merged statistics with per-tier breakdowns.
    pub fn stats(&self) -> CacheStats {
        let memory = self.memory.stats();
        let disk = self.disk.stats();
        let hits = memory.hits + disk.hits;
        let lookups = hits + memory.misses + disk.misses;
        CacheStats {
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            memory,
            disk,
        }
    }
}
