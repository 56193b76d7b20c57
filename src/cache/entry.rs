//! Cache entry metadata shared by the memory tier and eviction policies.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A stored value plus the access metadata eviction policies select on.
///
/// `access_count` starts at 0 on insert and is incremented only by `get`
/// hits, so LFU prefers evicting entries that were written but never read
/// back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached payload.
    pub value: V,
    /// Unix timestamp when the entry was created.
    pub created_at: u64,
    /// Unix timestamp when the entry was last accessed.
    pub last_accessed_at: u64,
    /// Number of cache hits for this entry.
    pub access_count: u64,
    /// Per-entry TTL override; `None` means the store default applies.
    pub ttl_secs: Option<u64>,
    /// Approximate serialized size in bytes, best effort.
    pub size_hint: usize,
}

impl<V: Serialize> CacheEntry<V> {
    pub fn new(value: V, now: u64, ttl_secs: Option<u64>) -> Self {
        let size_hint = serde_json::to_vec(&value).map(|b| b.len()).unwrap_or(0);
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl_secs,
            size_hint,
        }
    }
}

impl<V> CacheEntry<V> {
    /// Whether the entry's TTL has lapsed as of `now`.
    pub fn is_expired(&self, now: u64, default_ttl_secs: u64) -> bool {
        let ttl = self.ttl_secs.unwrap_or(default_ttl_secs);
        now.saturating_sub(self.created_at) > ttl
    }

    /// Record a hit: bump recency and frequency metadata.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
        self.access_count = self.access_count.saturating_add(1);
    }
}

/// Current unix time in whole seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
