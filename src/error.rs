//! Error types for the cache core.
//!
//! Only construction-time misconfiguration surfaces as an error. Runtime
//! cache trouble (missing keys, expired entries, corrupt or unwritable disk
//! records) is degraded to a miss and logged; callers always have the
//! fallback of performing the original computation.

use thiserror::Error;

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by cache construction and internal disk helpers.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid configuration: zero capacity, or an unusable disk directory.
    /// Raised at construction, never deferred to first use.
    #[error("invalid cache configuration: {0}")]
    Config(String),

    /// Filesystem error from the disk tier's internal helpers.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized or deserialized.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
