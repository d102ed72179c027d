//! Seeded key-to-shard mapping.
//!
//! ```text
//!   key ──► DefaultHasher(seed, key) ──► h & (shards - 1) ──► shard index
//!
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! The shard count is always a power of two so the reduction is a mask. The
//! mapping is deterministic for one selector; selectors with different seeds
//! spread the same keys differently.
//!
//! ```
//! use pagecache::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(8, 42);
//! let shard = selector.shard_for_key(&(7_u32, 3_u32));
//! assert!(shard < 8);
//! assert_eq!(selector.shard_for_key(&(7_u32, 3_u32)), shard);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic shard selector using a seeded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    mask: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is rounded up to a power of two (and at least 1).
    ///
    /// ```
    /// use pagecache::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(64, 0).shard_count(), 64);
    /// assert_eq!(ShardSelector::new(5, 0).shard_count(), 8);
    /// assert_eq!(ShardSelector::new(0, 0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            mask: shards.max(1).next_power_of_two() - 1,
            seed,
        }
    }

    /// Creates a selector with a seed drawn from the thread-local RNG.
    pub fn with_random_seed(shards: usize) -> Self {
        Self::new(shards, rand::random())
    }

    pub fn shard_count(&self) -> usize {
        self.mask + 1
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Maps a key to a shard index in `[0, shard_count)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) & self.mask
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_selector_is_deterministic() {
        let selector = ShardSelector::new(8, 123);

        let a = selector.shard_for_key(&"key");
        let b = selector.shard_for_key(&"key");
        assert_eq!(a, b);
        assert!(a < selector.shard_count());
    }

    #[test]
    fn shard_selector_spreads_sequential_pages() {
        let selector = ShardSelector::with_random_seed(64);
        let mut counts = [0usize; 64];
        for page in 0..64 * 256u32 {
            counts[selector.shard_for_key(&(1u32, page))] += 1;
        }
        // 256 expected per shard.
        assert!(counts.iter().all(|&c| c > 64), "{counts:?}");
    }

    #[test]
    fn single_shard_always_maps_to_zero() {
        let selector = ShardSelector::default();
        for key in 0..100u64 {
            assert_eq!(selector.shard_for_key(&key), 0);
        }
    }
}
