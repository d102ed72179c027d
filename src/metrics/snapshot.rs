use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Cache statistics accumulated since construction.
///
/// Every counter only grows. A snapshot taken from [`PageCache::stats`]
/// sums the shards one at a time, so counters are individually exact but
/// not captured at one instant.
///
/// [`PageCache::stats`]: crate::pagecache::PageCache::stats
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageCacheStats {
    pub lookups: u64,     // page reads attempted against the cache
    pub hits: u64,        // page reads served from memory
    pub inserts: u64,     // pages published after a fetch
    pub evictions: u64,   // resident pages reclaimed
    pub allocations: u64, // slots taken from a free stack
    pub frees: u64,       // slots returned to a free stack
}

impl PageCacheStats {
    /// Fraction of lookups that hit, or `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        if self.lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / self.lookups as f64)
        }
    }

    pub fn misses(&self) -> u64 {
        self.lookups - self.hits
    }

    /// Slots taken off the free stacks and not yet returned: resident pages
    /// plus fetches in flight.
    pub fn slots_in_use(&self) -> u64 {
        self.allocations - self.frees
    }
}

impl Add for PageCacheStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for PageCacheStats {
    fn add_assign(&mut self, rhs: Self) {
        self.lookups += rhs.lookups;
        self.hits += rhs.hits;
        self.inserts += rhs.inserts;
        self.evictions += rhs.evictions;
        self.allocations += rhs.allocations;
        self.frees += rhs.frees;
    }
}

impl Sum for PageCacheStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
