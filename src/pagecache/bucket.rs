//! One independently locked shard of the page cache.
//!
//! ```text
//!   Bucket
//!   ┌───────────────────────────────────────────────────────────────┐
//!   │ Mutex<BucketState>                                            │
//!   │   pages:   [ slot 0 | slot 1 | slot 2 | ... | slot cap-1 ]    │
//!   │   free:    [ 7, 5, 6 ]                    (LIFO)              │
//!   │   index:   I: EvictionIndex<Region, PageSlot>  (LruIndex)     │
//!   │   metrics: BucketMetrics                                      │
//!   └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every slot is, at any instant, on the free stack, bound to exactly one
//! region in the index, or held by exactly one reader between
//! [`Bucket::acquire_slot`] and [`Bucket::install`] / [`Bucket::release`].
//! Only bookkeeping and memory copies happen under the lock; fetching from
//! the backing source is the reader's business and happens unlocked.

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::metrics::PageCacheStats;
use crate::metrics::metrics_impl::BucketMetrics;
use crate::metrics::traits::{MetricsSnapshotProvider, PageMetricsRecorder};
use crate::pagecache::Region;
use crate::policy::lru::LruIndex;
use crate::traits::EvictionIndex;

/// Index of a page slot inside its bucket's byte region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PageSlot(u32);

impl PageSlot {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct BucketState<I> {
    pages: Box<[u8]>,
    free: Vec<PageSlot>,
    index: I,
    metrics: BucketMetrics,
}

impl<I> BucketState<I> {
    fn page_mut(&mut self, slot: PageSlot, page_shift: u32) -> &mut [u8] {
        let start = slot.index() << page_shift;
        &mut self.pages[start..start + (1 << page_shift)]
    }

    fn page(&self, slot: PageSlot, page_shift: u32) -> &[u8] {
        let start = slot.index() << page_shift;
        &self.pages[start..start + (1 << page_shift)]
    }
}

/// A shard whose recency policy is the index `I`; the cache uses
/// [`LruIndex`].
#[derive(Debug)]
pub(crate) struct Bucket<I = LruIndex<Region, PageSlot>> {
    state: Mutex<BucketState<I>>,
    page_shift: u32,
    capacity: usize,
}

impl Bucket {
    /// Allocates `capacity` zeroed pages of `1 << page_shift` bytes, all free.
    pub(crate) fn new(capacity: usize, page_shift: u32) -> Self {
        Self::with_index(capacity, page_shift, LruIndex::with_capacity(capacity))
    }
}

impl<I> Bucket<I>
where
    I: EvictionIndex<Region, PageSlot>,
{
    /// Like [`Bucket::new`], with an empty `index` deciding evictions.
    pub(crate) fn with_index(capacity: usize, page_shift: u32, index: I) -> Self {
        debug_assert!(u32::try_from(capacity).is_ok());
        debug_assert!(index.is_empty());
        let free = (0..capacity as u32).rev().map(PageSlot).collect();
        Self {
            state: Mutex::new(BucketState {
                pages: vec![0u8; capacity << page_shift].into_boxed_slice(),
                free,
                index,
                metrics: BucketMetrics::default(),
            }),
            page_shift,
            capacity,
        }
    }

    /// Copies the resident page for `key`, starting at `offset` within the
    /// page, into `dest`. Returns `false` on a miss.
    ///
    /// A hit is reported to the index as an access (under [`LruIndex`] it
    /// becomes most recently used). Copies
    /// `min(dest.len(), page_size - offset)` bytes.
    pub(crate) fn read(&self, key: Region, dest: &mut [u8], offset: usize) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let hit = match state.index.lookup(&key) {
            Some(&slot) => {
                let page = state.page(slot, self.page_shift);
                let src = &page[offset..];
                let n = dest.len().min(src.len());
                dest[..n].copy_from_slice(&src[..n]);
                true
            },
            None => false,
        };
        state.metrics.record_lookup(hit);
        hit
    }

    /// Hands out a slot for a page about to be fetched: a free one if any,
    /// otherwise the index gives up its coldest page.
    ///
    /// Returns `None` when the bucket has neither.
    pub(crate) fn acquire_slot(&self) -> Option<PageSlot> {
        let mut state = self.state.lock();

        if let Some(slot) = state.free.pop() {
            state.metrics.record_allocation();
            return Some(slot);
        }

        match state.index.evict() {
            Some((victim, slot)) => {
                state.metrics.record_eviction();
                trace!(
                    object_id = victim.object_id,
                    page_index = victim.page_index,
                    "evicted page"
                );
                Some(slot)
            },
            None => {
                warn!(capacity = self.capacity, "bucket has no free or evictable pages");
                None
            },
        }
    }

    /// Stores `data` into `slot` and publishes it under `key`.
    ///
    /// If `key` was already bound (another reader fetched the same page
    /// concurrently), the older slot goes back on the free stack.
    pub(crate) fn install(&self, key: Region, slot: PageSlot, data: &[u8]) {
        let mut state = self.state.lock();

        let page = state.page_mut(slot, self.page_shift);
        let n = data.len().min(page.len());
        page[..n].copy_from_slice(&data[..n]);
        page[n..].fill(0);

        if let Some(previous) = state.index.insert(key, slot) {
            state.free.push(previous);
            state.metrics.record_free();
            trace!(
                object_id = key.object_id,
                page_index = key.page_index,
                "concurrent fetch lost, slot freed"
            );
        }
        state.metrics.record_insert();
    }

    /// Returns a slot that was acquired but will not be installed.
    pub(crate) fn release(&self, slot: PageSlot) {
        let mut state = self.state.lock();
        state.free.push(slot);
        state.metrics.record_free();
    }

    pub(crate) fn stats(&self) -> PageCacheStats {
        self.state.lock().metrics.snapshot()
    }

    /// Number of resident pages.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub(crate) fn free_len(&self) -> usize {
        self.state.lock().free.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        state.index.debug_validate_invariants();

        let mut owned = vec![false; self.capacity];
        let mut claim = |slot: PageSlot| {
            assert!(slot.index() < self.capacity, "slot {slot:?} out of range");
            assert!(!owned[slot.index()], "slot {slot:?} owned twice");
            owned[slot.index()] = true;
        };
        for slot in &state.free {
            claim(*slot);
        }
        state.index.range(|_, slot| {
            claim(*slot);
            true
        });

        assert!(state.index.len() <= self.capacity);
        let m = &state.metrics;
        assert!(m.hits <= m.lookups);
        assert_eq!(
            (self.capacity - state.free.len()) as u64,
            m.allocations - m.frees,
            "free stack deficit must match allocations - frees"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const SHIFT: u32 = 4; // 16-byte pages

    fn key(page_index: u32) -> Region {
        Region {
            object_id: 1,
            page_index,
        }
    }

    fn page(fill: u8) -> Vec<u8> {
        vec![fill; 1 << SHIFT]
    }

    fn fill(bucket: &Bucket, page_index: u32, value: u8) {
        let slot = bucket.acquire_slot().unwrap();
        bucket.install(key(page_index), slot, &page(value));
    }

    #[test]
    fn miss_counts_lookup_only() {
        let bucket = Bucket::new(2, SHIFT);
        let mut dest = [0u8; 4];
        assert!(!bucket.read(key(0), &mut dest, 0));

        let stats = bucket.stats();
        assert_eq!(stats.lookups, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.allocations, 0);
        assert_eq!(bucket.free_len(), 2);
    }

    #[test]
    fn hit_copies_from_intra_page_offset() {
        let bucket = Bucket::new(2, SHIFT);
        let slot = bucket.acquire_slot().unwrap();
        let data: Vec<u8> = (0..16).collect();
        bucket.install(key(3), slot, &data);

        let mut dest = [0u8; 32];
        assert!(bucket.read(key(3), &mut dest, 10));
        assert_eq!(&dest[..6], &[10, 11, 12, 13, 14, 15]);
        assert_eq!(&dest[6..], &[0u8; 26]);

        let mut small = [0u8; 2];
        assert!(bucket.read(key(3), &mut small, 4));
        assert_eq!(small, [4, 5]);

        let stats = bucket.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn short_install_zero_fills_tail() {
        let bucket = Bucket::new(1, SHIFT);
        fill(&bucket, 0, 0xff);
        // Reuse the slot through eviction with a shorter page.
        let slot = bucket.acquire_slot().unwrap();
        bucket.install(key(1), slot, &[7, 7, 7]);

        let mut dest = [1u8; 16];
        assert!(bucket.read(key(1), &mut dest, 0));
        assert_eq!(&dest[..3], &[7, 7, 7]);
        assert!(dest[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn exhausted_free_stack_evicts_least_recent() {
        let bucket = Bucket::new(3, SHIFT);
        fill(&bucket, 0, 0);
        fill(&bucket, 1, 1);
        fill(&bucket, 2, 2);
        assert_eq!(bucket.free_len(), 0);

        fill(&bucket, 3, 3);

        let mut dest = [0u8; 1];
        assert!(!bucket.read(key(0), &mut dest, 0));
        for page_index in 1..=3 {
            assert!(bucket.read(key(page_index), &mut dest, 0));
            assert_eq!(dest[0], page_index as u8);
        }

        let stats = bucket.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.allocations, 3);
        assert_eq!(stats.inserts, 4);
        bucket.debug_validate_invariants();
    }

    #[test]
    fn read_hit_promotes_over_untouched_entries() {
        let bucket = Bucket::new(3, SHIFT);
        fill(&bucket, 0, 0);
        fill(&bucket, 1, 1);
        fill(&bucket, 2, 2);

        let mut dest = [0u8; 1];
        assert!(bucket.read(key(0), &mut dest, 0));

        fill(&bucket, 3, 3);
        assert!(bucket.read(key(0), &mut dest, 0));
        assert!(!bucket.read(key(1), &mut dest, 0));
    }

    #[test]
    fn losing_install_returns_slot_to_free_stack() {
        let bucket = Bucket::new(4, SHIFT);
        let first = bucket.acquire_slot().unwrap();
        let second = bucket.acquire_slot().unwrap();
        assert_ne!(first, second);

        bucket.install(key(9), first, &page(1));
        bucket.install(key(9), second, &page(2));

        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.free_len(), 3);

        let mut dest = [0u8; 1];
        assert!(bucket.read(key(9), &mut dest, 0));
        assert_eq!(dest[0], 2);

        let stats = bucket.stats();
        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.allocations - stats.frees, 1);
        bucket.debug_validate_invariants();
    }

    #[test]
    fn released_slot_is_reused() {
        let bucket = Bucket::new(1, SHIFT);
        let slot = bucket.acquire_slot().unwrap();
        bucket.release(slot);
        assert_eq!(bucket.free_len(), 1);
        assert_eq!(bucket.acquire_slot(), Some(slot));
        bucket.release(slot);
        bucket.debug_validate_invariants();
    }

    #[test]
    fn zero_capacity_bucket_has_no_pages() {
        let bucket = Bucket::new(0, SHIFT);
        assert_eq!(bucket.acquire_slot(), None);
        assert_eq!(bucket.capacity(), 0);
    }

    /// Insertion-order index: hits never change which page goes first.
    #[derive(Debug, Default)]
    struct InsertionOrder(VecDeque<(Region, PageSlot)>);

    impl EvictionIndex<Region, PageSlot> for InsertionOrder {
        fn insert(&mut self, key: Region, value: PageSlot) -> Option<PageSlot> {
            let previous = self.delete(&key);
            self.0.push_back((key, value));
            previous
        }

        fn lookup(&mut self, key: &Region) -> Option<&PageSlot> {
            self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
        }

        fn delete(&mut self, key: &Region) -> Option<PageSlot> {
            let pos = self.0.iter().position(|(k, _)| k == key)?;
            self.0.remove(pos).map(|(_, v)| v)
        }

        fn evict(&mut self) -> Option<(Region, PageSlot)> {
            self.0.pop_front()
        }

        fn range<F>(&self, mut visit: F)
        where
            F: FnMut(&Region, &PageSlot) -> bool,
        {
            for (k, v) in &self.0 {
                if !visit(k, v) {
                    break;
                }
            }
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn eviction_follows_the_bucket_index() {
        let bucket = Bucket::with_index(2, SHIFT, InsertionOrder::default());
        for page_index in 0..2 {
            let slot = bucket.acquire_slot().unwrap();
            bucket.install(key(page_index), slot, &page(page_index as u8));
        }

        // A hit on page 0 would save it under LRU; insertion order ignores it.
        let mut dest = [0u8; 1];
        assert!(bucket.read(key(0), &mut dest, 0));

        let slot = bucket.acquire_slot().unwrap();
        bucket.install(key(2), slot, &page(2));

        assert!(!bucket.read(key(0), &mut dest, 0));
        assert!(bucket.read(key(1), &mut dest, 0));
        assert_eq!(dest[0], 1);
        assert_eq!(bucket.stats().evictions, 1);
        bucket.debug_validate_invariants();
    }

    #[test]
    fn in_flight_slots_are_not_evictable() {
        let bucket = Bucket::new(1, SHIFT);
        let held = bucket.acquire_slot().unwrap();
        assert_eq!(bucket.acquire_slot(), None);
        bucket.install(key(0), held, &page(5));
        assert!(bucket.acquire_slot().is_some());
    }
}
