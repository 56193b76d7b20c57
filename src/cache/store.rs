//! Bounded in-memory cache store with TTL expiry and pluggable eviction.
//!
//! One mutex-guarded critical section per operation; the sections are short
//! (a map lookup plus metadata bumps), so a store-wide lock keeps every
//! public method safe under concurrent callers without external
//! synchronization. Nothing in this tier blocks on I/O.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::entry::{now_secs, CacheEntry};
use super::policy::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Generic bounded key-to-entry table.
///
/// Callers receive clones of stored values, never aliases into the table, so
/// recency/frequency bookkeeping stays authoritative inside the store.
pub struct BoundedCache<K, V> {
    capacity: usize,
    default_ttl_secs: u64,
    policy: EvictionPolicy,
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    inserts: u64,
    evictions: u64,
    expirations: u64,
}

/// Cumulative counters since store creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// `hits / (hits + misses)`, 0.0 when no lookups have occurred.
    pub hit_rate: f64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone + Serialize,
{
    /// Create a store holding at most `capacity` live entries.
    ///
    /// Fails with [`CacheError::Config`] when `capacity` is zero.
    pub fn new(capacity: usize, default_ttl_secs: u64, policy: EvictionPolicy) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::Config(
                "cache capacity must be greater than zero".into(),
            ));
        }
        Ok(Self {
            capacity,
            default_ttl_secs,
            policy,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                inserts: 0,
                evictions: 0,
                expirations: 0,
            }),
        })
    }

    /// Insert or overwrite an entry.
    ///
    /// When inserting a new key at capacity, a victim is evicted via the
    /// active policy *before* the insert; the table never transiently
    /// exceeds `capacity`. Overwriting an existing key resets its
    /// timestamps and access count.
    pub fn set(&self, key: K, value: V, ttl_secs: Option<u64>) {
        let now = now_secs();
        let mut inner = self.lock();
        while !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let Some(victim) = self.policy.select_victim(&inner.entries) else {
                break;
            };
            debug!(key = ?victim, policy = ?self.policy, "Evicting cache entry");
            inner.entries.remove(&victim);
            inner.evictions += 1;
        }
        inner.entries.insert(key, CacheEntry::new(value, now, ttl_secs));
        inner.inserts += 1;
    }

    /// Look up a value. Returns `None` for unknown or expired keys.
    ///
    /// An expired entry observed here is deleted as a side effect, not
    /// merely skipped. Live hits bump `last_accessed_at` and
    /// `access_count`; the return is a clone of the stored value.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = now_secs();
        let mut inner = self.lock();
        // Check expiry with an immutable borrow first to avoid overlapping borrows.
        let expired = inner
            .entries
            .get(key)
            .map(|e| e.is_expired(now, self.default_ttl_secs));
        match expired {
            Some(true) => {
                debug!(key = ?key, "Cache entry expired, removing");
                inner.entries.remove(key);
                inner.expirations += 1;
                inner.misses += 1;
                None
            }
            Some(false) => {
                inner.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.touch(now);
                Some(entry.value.clone())
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Remove an entry if present. Idempotent.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Actively reclaim every expired entry, returning the count removed.
    ///
    /// Lazy expiry via `get` never touches entries nobody queries; this
    /// sweep keeps them from consuming capacity indefinitely.
    pub fn cleanup_expired(&self) -> usize {
        let now = now_secs();
        let default_ttl = self.default_ttl_secs;
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| !entry.is_expired(now, default_ttl));
        let removed = before - inner.entries.len();
        inner.expirations += removed as u64;
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Number of physically present entries (expired-but-unswept included).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Snapshot of the cumulative counters.
    pub fn stats(&self) -> StoreStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        StoreStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            inserts: inner.inserts,
            evictions: inner.evictions,
            expirations: inner.expirations,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }

    // A panicked holder leaves the map in a consistent state (every mutation
    // completes before the guard drops), so poisoning is recovered rather
    // than propagated.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewrite an entry's timestamps so TTL/eviction tests need no sleeps.
    #[cfg(test)]
    pub(crate) fn backdate(&self, key: &K, created_at: u64, last_accessed_at: u64) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.created_at = created_at;
            entry.last_accessed_at = last_accessed_at;
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store(capacity: usize, policy: EvictionPolicy) -> BoundedCache<String, String> {
        BoundedCache::new(capacity, 3600, policy).unwrap()
    }

    #[test]
    fn test_zero_capacity_is_a_construction_error() {
        let result = BoundedCache::<String, String>::new(0, 60, EvictionPolicy::Lru);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_set_get_roundtrip() {
        let cache = store(4, EvictionPolicy::Lru);
        assert!(cache.get(&"k".to_string()).is_none());
        cache.set("k".into(), "value".into(), None);
        assert_eq!(cache.get(&"k".to_string()), Some("value".to_string()));
    }

    #[test]
    fn test_expired_entry_is_deleted_on_observation() {
        let cache = store(4, EvictionPolicy::Lru);
        cache.set("k".into(), "v".into(), Some(60));
        let past = now_secs() - 120;
        cache.backdate(&"k".to_string(), past, past);
        assert!(cache.get(&"k".to_string()).is_none());
        assert!(!cache.contains(&"k".to_string()), "expiry deletes, not skips");
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_entry_live_just_inside_ttl() {
        let cache = store(4, EvictionPolicy::Lru);
        cache.set("k".into(), "v".into(), Some(60));
        let almost = now_secs() - 59;
        cache.backdate(&"k".to_string(), almost, almost);
        assert_eq!(cache.get(&"k".to_string()), Some("v".to_string()));
    }

    #[test]
    fn test_lru_eviction_respects_recency() {
        // Capacity 2: set A, set B, get A, set C. B must be the victim.
        let cache = store(2, EvictionPolicy::Lru);
        cache.set("a".into(), "a-val".into(), None);
        cache.set("b".into(), "b-val".into(), None);
        // Timestamps are whole seconds; order the accesses explicitly.
        let now = now_secs();
        cache.backdate(&"a".to_string(), now - 30, now - 30);
        cache.backdate(&"b".to_string(), now - 20, now - 20);
        assert_eq!(cache.get(&"a".to_string()), Some("a-val".to_string()));
        cache.set("c".into(), "c-val".into(), None);

        assert!(cache.get(&"b".to_string()).is_none(), "b was least recent");
        assert_eq!(cache.get(&"a".to_string()), Some("a-val".to_string()));
        assert_eq!(cache.get(&"c".to_string()), Some("c-val".to_string()));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_fifo_eviction_ignores_gets() {
        let cache = store(2, EvictionPolicy::Fifo);
        cache.set("first".into(), "1".into(), None);
        cache.set("second".into(), "2".into(), None);
        let now = now_secs();
        cache.backdate(&"first".to_string(), now - 30, now - 30);
        cache.backdate(&"second".to_string(), now - 20, now - 20);
        // Touch "first"; FIFO must still evict it.
        assert!(cache.get(&"first".to_string()).is_some());
        cache.set("third".into(), "3".into(), None);

        assert!(!cache.contains(&"first".to_string()));
        assert!(cache.contains(&"second".to_string()));
        assert!(cache.contains(&"third".to_string()));
    }

    #[test]
    fn test_lfu_evicts_never_reread_entry() {
        let cache = store(2, EvictionPolicy::Lfu);
        cache.set("hot".into(), "h".into(), None);
        cache.set("cold".into(), "c".into(), None);
        assert!(cache.get(&"hot".to_string()).is_some());
        assert!(cache.get(&"hot".to_string()).is_some());
        cache.set("new".into(), "n".into(), None);

        assert!(!cache.contains(&"cold".to_string()), "access_count 0 loses");
        assert!(cache.contains(&"hot".to_string()));
    }

    #[test]
    fn test_capacity_never_transiently_exceeded() {
        let cache = store(3, EvictionPolicy::Lru);
        for i in 0..10 {
            cache.set(format!("k{i}"), format!("v{i}"), None);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 7);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = store(2, EvictionPolicy::Lru);
        cache.set("a".into(), "1".into(), None);
        cache.set("b".into(), "2".into(), None);
        cache.set("a".into(), "3".into(), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&"a".to_string()), Some("3".to_string()));
    }

    #[test]
    fn test_overwrite_resets_access_metadata() {
        let cache = store(2, EvictionPolicy::Lfu);
        cache.set("a".into(), "1".into(), None);
        assert!(cache.get(&"a".to_string()).is_some());
        cache.set("a".into(), "2".into(), None);
        cache.set("b".into(), "3".into(), None);
        assert!(cache.get(&"b".to_string()).is_some());
        // "a" was rewritten (count reset to 0), "b" has one hit.
        cache.set("c".into(), "4".into(), None);
        assert!(!cache.contains(&"a".to_string()));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = store(2, EvictionPolicy::Lru);
        cache.set("a".into(), "1".into(), None);
        assert!(cache.delete(&"a".to_string()));
        assert!(!cache.delete(&"a".to_string()));
        assert!(!cache.delete(&"never".to_string()));
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = store(4, EvictionPolicy::Lru);
        cache.set("a".into(), "1".into(), None);
        cache.set("b".into(), "2".into(), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let cache = store(8, EvictionPolicy::Lru);
        cache.set("live".into(), "l".into(), None);
        cache.set("dead1".into(), "d".into(), Some(10));
        cache.set("dead2".into(), "d".into(), Some(10));
        let past = now_secs() - 100;
        cache.backdate(&"dead1".to_string(), past, past);
        cache.backdate(&"dead2".to_string(), past, past);

        assert_eq!(cache.cleanup_expired(), 2);
        assert!(cache.contains(&"live".to_string()));
        assert_eq!(cache.cleanup_expired(), 0, "second sweep finds nothing");
    }

    #[test]
    fn test_stats_arithmetic() {
        let cache = store(4, EvictionPolicy::Lru);
        assert_eq!(cache.stats().hit_rate, 0.0, "no lookups yet");

        cache.set("a".into(), "1".into(), None);
        let _ = cache.get(&"a".to_string());
        let _ = cache.get(&"a".to_string());
        let _ = cache.get(&"missing".to_string());

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_access_holds_capacity_invariant() {
        let cache = Arc::new(store(16, EvictionPolicy::Lru));
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    cache.set(format!("t{t}-k{i}"), "v".into(), None);
                    let _ = cache.get(&format!("t{t}-k{}", i / 2));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 16);
        let stats = cache.stats();
        assert_eq!(stats.inserts, 800);
        assert_eq!(stats.hits + stats.misses, 800);
    }
}
