//! Deterministic cache key derivation.
//!
//! A key is the SHA-256 digest of a canonical encoding of the request:
//! provider, model, system prompt, the message sequence in its given order,
//! temperature, and the sorted extra sampling parameters. Every
//! variable-length field is length-prefixed to prevent separator collisions
//! (e.g. `model="a|b"` vs `model="a", system="|b"`).
//!
//! Derivation doubles as the eligibility gate: a request whose temperature
//! is not exactly zero has no key at all, so callers cannot accidentally
//! look up or store a non-deterministic generation.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::model::CompletionRequest;

/// Hex-encoded SHA-256 digest identifying a cacheable request.
///
/// The hex form is filesystem-safe and doubles as the disk record's file
/// stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request, or `None` if the request is not
    /// cache-eligible (non-zero temperature).
    pub fn derive(request: &CompletionRequest) -> Option<Self> {
        if !request.is_deterministic() {
            return None;
        }

        let mut hasher = Sha256::new();
        update_str(&mut hasher, &request.provider);
        update_str(&mut hasher, &request.model);

        // Presence tag distinguishes "no system prompt" from an empty one.
        match &request.system_prompt {
            Some(prompt) => {
                hasher.update([1u8]);
                update_str(&mut hasher, prompt);
            }
            None => hasher.update([0u8]),
        }

        // Message order is semantically significant, so it is encoded as given.
        hasher.update((request.messages.len() as u64).to_le_bytes());
        for message in &request.messages {
            update_str(&mut hasher, message.role.as_str());
            update_str(&mut hasher, &message.content);
        }

        hasher.update(request.temperature.to_le_bytes());

        // BTreeMap iterates name-sorted, so param insertion order is
        // irrelevant to the digest.
        hasher.update((request.extra_params.len() as u64).to_le_bytes());
        for (name, value) in &request.extra_params {
            update_str(&mut hasher, name);
            update_str(&mut hasher, &value.to_string());
        }

        Some(Self(format!("{:x}", hasher.finalize())))
    }

    /// Full 64-character lowercase hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Short prefix for log fields.
    pub fn log_prefix(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
