//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, deterministic randomness.
//! Given the same seed, produces identical sequence on all platforms,
//! which is what lets a saved or replicated run redraw the same cards.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// The state is serialized as part of the run snapshot, so a reduction
/// applied to a loaded or replicated state draws exactly what the
/// original would have drawn.
///
/// # Example
///
/// ```
/// use helldraft::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_below(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        // Modulo bias is negligible for the small ranges drafting uses
        self.next_u64() % max
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Walks the cumulative sum in slice order, so equal weights resolve
    /// by position. Returns `None` when every weight is zero.
    pub fn weighted_index(&mut self, weights: &[u64]) -> Option<usize> {
        let total: u64 = weights.iter().fold(0u64, |acc, w| acc.saturating_add(*w));
        if total == 0 {
            return None;
        }

        let mut roll = self.next_below(total);
        for (idx, weight) in weights.iter().enumerate() {
            if roll < *weight {
                return Some(idx);
            }
            roll -= *weight;
        }

        // Unreachable while total is the exact sum
        weights.iter().rposition(|w| *w > 0)
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a run seed from the session and its players.
///
/// `player_ids` MUST be sorted; the caller owns that ordering so every
/// peer derives the same seed from the same lobby.
pub fn derive_run_seed(session_id: &[u8; 16], player_ids: &[[u8; 16]]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"HELLDRAFT_RUN_SEED_V1");
    hasher.update(session_id);

    for pid in player_ids {
        hasher.update(pid);
    }

    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_below() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_below(100) < 100);
        }

        assert_eq!(rng.next_below(0), 0);
        assert_eq!(rng.next_below(1), 0);
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = DeterministicRng::new(77);
        let weights = [0, 5, 0, 3];

        for _ in 0..500 {
            let idx = rng.weighted_index(&weights).unwrap();
            assert!(idx == 1 || idx == 3);
        }

        assert_eq!(rng.weighted_index(&[0, 0]), None);
        assert_eq!(rng.weighted_index(&[]), None);
    }

    #[test]
    fn test_weighted_index_follows_weights() {
        let mut rng = DeterministicRng::new(4242);
        let weights = [90, 10];
        let mut hits = [0u32; 2];

        for _ in 0..10_000 {
            hits[rng.weighted_index(&weights).unwrap()] += 1;
        }

        // 9000 expected for the heavy side
        assert!(hits[0] > 8700 && hits[0] < 9300, "hits: {:?}", hits);
    }

    #[test]
    fn test_derive_run_seed() {
        let session = [1u8; 16];
        let players = [[2u8; 16], [3u8; 16]];

        let seed1 = derive_run_seed(&session, &players);
        let seed2 = derive_run_seed(&session, &players);
        assert_eq!(seed1, seed2);

        let seed3 = derive_run_seed(&[9u8; 16], &players);
        assert_ne!(seed1, seed3);
    }

    #[test]
    fn test_serialized_state_resumes() {
        let mut rng = DeterministicRng::new(5555);

        for _ in 0..50 {
            rng.next_u64();
        }

        let bytes = bincode::serialize(&rng).unwrap();
        let next_values: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();

        let mut restored: DeterministicRng = bincode::deserialize(&bytes).unwrap();
        for expected in next_values {
            assert_eq!(restored.next_u64(), expected);
        }
    }
}
