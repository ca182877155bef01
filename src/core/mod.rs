//! Core deterministic primitives.
//!
//! Seeded randomness and state digests. Everything the reducer draws
//! comes from here so that identical snapshots reduce identically.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{StateHash, digest_serialized};
