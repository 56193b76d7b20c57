//! Cache configuration surface.
//!
//! Values arrive already validated from the host application's config
//! loader; this crate never parses config files itself. All fields carry
//! serde defaults so a partial `[cache]` table deserializes cleanly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;

/// Knobs for the tiered response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When false the cache is constructed successfully and
    /// every operation is a no-op.
    pub enabled: bool,
    /// Maximum live entry count in the memory tier. Must be > 0.
    pub max_memory_entries: usize,
    /// Default TTL for memory-tier entries, in seconds.
    pub memory_ttl_secs: u64,
    /// Default TTL for disk-tier records, in seconds.
    pub disk_ttl_secs: u64,
    /// Whether the disk tier is active. When false, disk behaves as
    /// permanently empty.
    pub disk_enabled: bool,
    /// Disk cache directory. `None` means `~/.promptcache/cache`.
    pub disk_dir: Option<PathBuf>,
    /// Eviction policy for the memory tier.
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_memory_entries: 1000,
            memory_ttl_secs: 3600,
            disk_ttl_secs: 7 * 24 * 3600,
            disk_enabled: true,
            disk_dir: None,
            policy: EvictionPolicy::Lru,
        }
    }
}

impl CacheConfig {
    /// The disk directory to use, falling back to `~/.promptcache/cache`.
    pub fn resolve_disk_dir(&self) -> PathBuf {
        self.disk_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".promptcache")
                .join("cache")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CacheConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.max_memory_entries, 1000);
        assert_eq!(cfg.memory_ttl_secs, 3600);
        assert_eq!(cfg.disk_ttl_secs, 604_800);
        assert!(cfg.disk_enabled);
        assert_eq!(cfg.policy, EvictionPolicy::Lru);
    }

    #[test]
    fn test_partial_table_deserializes() {
        let cfg: CacheConfig =
            serde_json::from_str(r#"{"enabled": true, "policy": "lfu"}"#).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.policy, EvictionPolicy::Lfu);
        assert_eq!(cfg.max_memory_entries, 1000);
    }

    #[test]
    fn test_explicit_disk_dir_wins() {
        let cfg = CacheConfig {
            disk_dir: Some(PathBuf::from("/tmp/somewhere")),
            ..CacheConfig::default()
        };
        assert_eq!(cfg.resolve_disk_dir(), PathBuf::from("/tmp/somewhere"));
    }
}
