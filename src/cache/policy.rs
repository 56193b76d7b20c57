//! Eviction policies for the bounded memory tier.
//!
//! Policies are pure functions of entry metadata and hold no auxiliary
//! state, so a store can switch policy at runtime without migrating entries.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;

/// Strategy for choosing a victim when an insertion would exceed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used. Tie-break: oldest `created_at`.
    #[default]
    Lru,
    /// Least frequently used. Tie-break: oldest `last_accessed_at`.
    Lfu,
    /// First in, first out, ignoring accesses entirely.
    Fifo,
}

impl EvictionPolicy {
    /// Select exactly one key to evict, or `None` when the table is empty.
    pub fn select_victim<K, V>(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K>
    where
        K: Eq + Hash + Clone,
    {
        let victim = match self {
            EvictionPolicy::Lru => entries
                .iter()
                .min_by_key(|(_, e)| (e.last_accessed_at, e.created_at)),
            EvictionPolicy::Lfu => entries
                .iter()
                .min_by_key(|(_, e)| (e.access_count, e.last_accessed_at)),
            EvictionPolicy::Fifo => entries.iter().min_by_key(|(_, e)| e.created_at),
        };
        victim.map(|(k, _)| k.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created: u64, accessed: u64, count: u64) -> CacheEntry<&'static str> {
        CacheEntry {
            value: "v",
            created_at: created,
            last_accessed_at: accessed,
            access_count: count,
            ttl_secs: None,
            size_hint: 0,
        }
    }

    #[test]
    fn test_lru_picks_oldest_access() {
        let mut entries = HashMap::new();
        entries.insert("a", entry(1, 500, 9));
        entries.insert("b", entry(2, 100, 0));
        entries.insert("c", entry(3, 900, 1));
        assert_eq!(EvictionPolicy::Lru.select_victim(&entries), Some("b"));
    }

    #[test]
    fn test_lru_tie_breaks_on_created_at() {
        let mut entries = HashMap::new();
        entries.insert("a", entry(5, 100, 0));
        entries.insert("b", entry(2, 100, 0));
        assert_eq!(EvictionPolicy::Lru.select_victim(&entries), Some("b"));
    }

    #[test]
    fn test_lfu_picks_smallest_count() {
        let mut entries = HashMap::new();
        entries.insert("a", entry(1, 100, 3));
        entries.insert("b", entry(2, 900, 1));
        entries.insert("c", entry(3, 500, 7));
        assert_eq!(EvictionPolicy::Lfu.select_victim(&entries), Some("b"));
    }

    #[test]
    fn test_lfu_tie_breaks_on_oldest_access() {
        let mut entries = HashMap::new();
        entries.insert("a", entry(1, 300, 2));
        entries.insert("b", entry(2, 200, 2));
        assert_eq!(EvictionPolicy::Lfu.select_victim(&entries), Some("b"));
    }

    #[test]
    fn test_fifo_ignores_accesses() {
        let mut entries = HashMap::new();
        entries.insert("a", entry(1, 9999, 50));
        entries.insert("b", entry(2, 1, 0));
        assert_eq!(EvictionPolicy::Fifo.select_victim(&entries), Some("a"));
    }

    #[test]
    fn test_empty_table_has_no_victim() {
        let entries: HashMap<&str, CacheEntry<&str>> = HashMap::new();
        assert_eq!(EvictionPolicy::Lru.select_victim(&entries), None);
    }

    #[test]
    fn test_config_names_roundtrip() {
        let p: EvictionPolicy = serde_json::from_str("\"fifo\"").unwrap();
        assert_eq!(p, EvictionPolicy::Fifo);
        assert_eq!(serde_json::to_string(&EvictionPolicy::Lfu).unwrap(), "\"lfu\"");
    }
}
