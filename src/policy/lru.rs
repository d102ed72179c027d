//! # Least Recently Used (LRU) Eviction Index
//!
//! Hash index plus recency list, used by every page-cache bucket to decide
//! which page to reclaim when its free stack runs dry.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LruIndex<K, V>                              │
//!   │                                                                      │
//!   │   FxHashMap<K, SlotId>                                               │
//!   │   ┌─────────┬────────┐                                               │
//!   │   │  (1, 0) │  id_3 ─┼──────────────────────────────┐                │
//!   │   │  (1, 1) │  id_1 ─┼────────┐                     │                │
//!   │   │  (2, 9) │  id_2 ─┼────────┼──────────┐          │                │
//!   │   └─────────┴────────┘        ▼          ▼          ▼                │
//!   │   IntrusiveList<Entry>   head ──► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//!   │                          (MRU)                                (LRU)  │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each list node holds the key next to the value so that `evict` can drop
//! the map entry of the tail without a reverse lookup.
//!
//! ## Operations
//!
//! | Method           | Complexity | Description                                |
//! |------------------|------------|--------------------------------------------|
//! | `insert(k, v)`   | O(1)       | Bind `k` at MRU, returns replaced value    |
//! | `lookup(&k)`     | O(1)       | Get value, moves it to MRU                 |
//! | `peek(&k)`       | O(1)       | Get value without touching recency         |
//! | `delete(&k)`     | O(1)       | Remove binding                             |
//! | `evict()`        | O(1)       | Remove and return the LRU entry            |
//! | `peek_lru()`     | O(1)       | Inspect the next eviction victim           |
//! | `range(f)`       | O(n)       | Visit entries until `f` returns `false`    |
//!
//! Recency order is total: every `insert` and every hit in `lookup` moves its
//! entry to the head, and `evict` always takes the tail. There is no
//! capacity here; the owner decides when to evict.
//!
//! ## Thread Safety
//!
//! `LruIndex` is not synchronized. Buckets keep it behind their mutex.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::traits::EvictionIndex;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// LRU index over `Copy` keys.
pub struct LruIndex<K, V>
where
    K: Copy + Eq + Hash,
{
    map: FxHashMap<K, SlotId>,
    list: IntrusiveList<Entry<K, V>>,
}

impl<K, V> LruIndex<K, V>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            list: IntrusiveList::new(),
        }
    }

    /// Creates an index that holds `capacity` entries without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            list: IntrusiveList::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Binds `key` to `value` at the MRU position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self
            .map
            .remove(&key)
            .and_then(|id| self.list.remove(id))
            .map(|entry| entry.value);
        let id = self.list.push_front(Entry { key, value });
        self.map.insert(key, id);
        previous
    }

    /// Returns the value for `key`, promoting it to MRU on a hit.
    pub fn lookup(&mut self, key: &K) -> Option<&V> {
        let id = *self.map.get(key)?;
        self.list.move_to_front(id);
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without changing recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.map.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    pub fn delete(&mut self, key: &K) -> Option<V> {
        let id = self.map.remove(key)?;
        self.list.remove(id).map(|entry| entry.value)
    }

    /// Removes the least recently used entry.
    pub fn evict(&mut self) -> Option<(K, V)> {
        let Entry { key, value } = self.list.pop_back()?;
        self.map.remove(&key);
        Some((key, value))
    }

    /// Returns the entry `evict` would remove next.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.list.back().map(|entry| (&entry.key, &entry.value))
    }

    /// Visits entries until `visit` returns `false`.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for entry in self.list.iter() {
            if !visit(&entry.key, &entry.value) {
                break;
            }
        }
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.list.iter().map(|entry| (&entry.key, &entry.value))
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(self.map.len(), self.list.len());
        for (id, entry) in self.list.iter_entries() {
            assert_eq!(self.map.get(&entry.key), Some(&id));
        }
    }
}

impl<K, V> Default for LruIndex<K, V>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for LruIndex<K, V>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruIndex")
            .field("len", &self.len())
            .field("lru", &self.peek_lru().map(|(key, _)| key))
            .finish()
    }
}

impl<K, V> EvictionIndex<K, V> for LruIndex<K, V>
where
    K: Copy + Eq + Hash,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        LruIndex::insert(self, key, value)
    }

    fn lookup(&mut self, key: &K) -> Option<&V> {
        LruIndex::lookup(self, key)
    }

    fn delete(&mut self, key: &K) -> Option<V> {
        LruIndex::delete(self, key)
    }

    fn evict(&mut self) -> Option<(K, V)> {
        LruIndex::evict(self)
    }

    fn range<F>(&self, visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        LruIndex::range(self, visit)
    }

    fn len(&self) -> usize {
        LruIndex::len(self)
    }

    #[cfg(any(test, debug_assertions))]
    fn debug_validate_invariants(&self) {
        LruIndex::debug_validate_invariants(self)
    }
}
