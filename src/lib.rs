//! Tiered response cache for deterministic LLM completions.
//!
//! Expensive, idempotent generation calls are cached in two tiers: a
//! bounded in-memory store (short TTL, pluggable LRU/LFU/FIFO eviction)
//! backed by a durable on-disk store (long TTL, one JSON record per key,
//! atomic writes). Keys are SHA-256 digests over a canonical encoding of
//! the request; only temperature-zero requests are eligible, since caching a
//! sampled output would silently replay one draw of a distribution.
//!
//! The cache never owns the upstream call. Call sites probe `get`, run the
//! real generation on a miss, then `set` the result:
//!
//! ```no_run
//! use promptcache::{CacheConfig, CachedResponse, ChatMessage, CompletionRequest, ResponseCache};
//!
//! # async fn generate(_req: &CompletionRequest) -> CachedResponse { unimplemented!() }
//! # async fn example() -> promptcache::Result<()> {
//! let cache = ResponseCache::new(&CacheConfig {
//!     enabled: true,
//!     ..CacheConfig::default()
//! })?;
//!
//! let request = CompletionRequest::new(
//!     "openai",
//!     "gpt-4",
//!     vec![ChatMessage::user("What is the capital of France?")],
//! );
//!
//! let response = match cache.get(&request).await {
//!     Some(cached) => cached,
//!     None => {
//!         let fresh = generate(&request).await;
//!         cache.set(&request, fresh.clone()).await;
//!         fresh
//!     }
//! };
//! # let _ = response;
//! # Ok(())
//! # }
//! ```
//!
//! Cache failures never abort the caller's workflow: misses, expired
//! entries, and corrupt or unwritable disk records all degrade to "absent".
//! Only construction-time misconfiguration is an error.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{
    BoundedCache, CacheEntry, CacheKey, CacheStats, DiskCache, DiskStats, EvictionPolicy,
    ResponseCache, StoreStats,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use model::{CachedResponse, ChatMessage, CompletionRequest, Role, ToolCallRecord, Usage};
