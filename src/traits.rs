//! # Eviction Index Contract
//!
//! A bucket of the page cache does not care how recency is tracked, only that
//! it can publish a page under a key, find it again, and reclaim the coldest
//! page when it runs out of free slots. That capability is captured by
//! [`EvictionIndex`].
//!
//! ```text
//!   ┌─────────────────────────────────────────┐
//!   │          EvictionIndex<K, V>            │
//!   │                                         │
//!   │  insert(&mut, K, V) → Option<V>         │
//!   │  lookup(&mut, &K) → Option<&V>          │
//!   │  delete(&mut, &K) → Option<V>           │
//!   │  evict(&mut) → Option<(K, V)>           │
//!   │  range(&, FnMut(&K, &V) → bool)         │
//!   │  len(&) → usize                         │
//!   └─────────────────────────────────────────┘
//!                       ▲
//!                       │
//!          LruIndex<K, V> (policy::lru)
//! ```
//!
//! Buckets are generic over the index and default to `LruIndex`.
//!
//! Implementations are single-threaded; the bucket serializes every call
//! behind its own mutex. Every operation is expected to be O(1) except
//! `range`.

/// Key/value index that decides which entry to give up under pressure.
///
/// # Example
///
/// ```
/// use pagecache::policy::lru::LruIndex;
/// use pagecache::traits::EvictionIndex;
///
/// fn coldest<I: EvictionIndex<u32, &'static str>>(index: &mut I) -> Option<u32> {
///     index.evict().map(|(key, _)| key)
/// }
///
/// let mut index = LruIndex::new();
/// index.insert(1, "one");
/// index.insert(2, "two");
/// index.lookup(&1);
/// assert_eq!(coldest(&mut index), Some(2));
/// ```
pub trait EvictionIndex<K, V> {
    /// Inserts `value` under `key` as the most recently used entry.
    ///
    /// Returns the value previously bound to `key`, if any. The previous
    /// binding is dropped from the index either way.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Returns the value bound to `key` and records the access.
    fn lookup(&mut self, key: &K) -> Option<&V>;

    /// Removes `key` from the index.
    fn delete(&mut self, key: &K) -> Option<V>;

    /// Removes and returns the entry the policy would give up first.
    fn evict(&mut self) -> Option<(K, V)>;

    /// Visits every entry in unspecified order until `visit` returns `false`.
    fn range<F>(&self, visit: F)
    where
        F: FnMut(&K, &V) -> bool;

    /// Returns the number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` when the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics if the index's internal bookkeeping is inconsistent.
    #[cfg(any(test, debug_assertions))]
    fn debug_validate_invariants(&self) {}
}
