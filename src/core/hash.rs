//! State Hashing for Verification
//!
//! Provides deterministic hashing of run state for:
//! - Convergence checks between host and guests
//! - Snapshot integrity on the realtime channel
//! - Replay validation in the demo binary

use serde::Serialize;
use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher with a domain separator.
///
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Hash the canonical bincode encoding of a value.
///
/// Only meaningful for types whose serialization is order-stable
/// (BTree collections, Vec, no HashMap).
pub fn digest_serialized<T: Serialize>(domain: &[u8], value: &T) -> Result<StateHash, bincode::Error> {
    let bytes = bincode::serialize(value)?;
    let mut hasher = StateHasher::new(domain);
    hasher.update_u64(bytes.len() as u64);
    hasher.update_bytes(&bytes);
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_hasher_determinism() {
        let mut a = StateHasher::new(b"A");
        let mut b = StateHasher::new(b"A");
        a.update_bytes(b"test data");
        b.update_bytes(b"test data");
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_domain_separation() {
        let data = vec![7u8; 4];
        assert_ne!(
            digest_serialized(b"DOMAIN_A", &data).unwrap(),
            digest_serialized(b"DOMAIN_B", &data).unwrap()
        );
    }

    #[test]
    fn test_digest_serialized_is_order_stable() {
        let mut a = BTreeMap::new();
        a.insert("b", 2u32);
        a.insert("a", 1u32);

        let mut b = BTreeMap::new();
        b.insert("a", 1u32);
        b.insert("b", 2u32);

        assert_eq!(
            digest_serialized(b"T", &a).unwrap(),
            digest_serialized(b"T", &b).unwrap()
        );
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = vec![1u32, 2, 3];
        let b = vec![1u32, 2, 4];
        assert_ne!(
            digest_serialized(b"T", &a).unwrap(),
            digest_serialized(b"T", &b).unwrap()
        );
    }
}
