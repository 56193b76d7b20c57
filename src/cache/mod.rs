//! Tiered LLM response caching with TTL expiry, pluggable eviction, and
//! JSON persistence.

pub mod disk;
pub mod entry;
pub mod key;
pub mod policy;
pub mod response;
pub mod store;

pub use disk::{DiskCache, DiskStats};
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use policy::EvictionPolicy;
pub use response::{CacheStats, ResponseCache};
pub use store::{BoundedCache, StoreStats};
