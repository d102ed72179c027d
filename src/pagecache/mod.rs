//! # Sharded Page Cache
//!
//! Caches fixed-size pages of any [`ReadAt`] source in a preallocated arena
//! split across [`SHARD_COUNT`] independently locked buckets.
//!
//! ## Architecture
//!
//! ```text
//!   CachedReader(object 7) ──┐        CachedReader(object 9) ──┐
//!                            ▼                                 ▼
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ PageCache                                                            │
//!   │   ShardSelector(seed) : Region { object_id, page_index } → bucket   │
//!   │                                                                      │
//!   │   ┌──────────┐ ┌──────────┐ ┌──────────┐          ┌──────────┐       │
//!   │   │ Bucket 0 │ │ Bucket 1 │ │ Bucket 2 │   ...    │ Bucket 63│       │
//!   │   │ Mutex    │ │ Mutex    │ │ Mutex    │          │ Mutex    │       │
//!   │   │ pages    │ │ pages    │ │ pages    │          │ pages    │       │
//!   │   │ free     │ │ free     │ │ free     │          │ free     │       │
//!   │   │ LruIndex │ │ LruIndex │ │ LruIndex │          │ LruIndex │       │
//!   │   └──────────┘ └──────────┘ └──────────┘          └──────────┘       │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All page memory is allocated up front and split evenly; a bucket never
//! borrows capacity from another and never waits on another. There is no
//! cache-wide lock.
//!
//! ## Read path
//!
//! ```text
//!   read_at(buf, off)
//!     │
//!     ├─ key = (object_id, off >> page_shift) ──► bucket = shard_of(key)
//!     │
//!     ├─ bucket.read(key)          hit  ─► copy out, next page
//!     │                            miss ─┐
//!     ├─ bucket.acquire_slot()  ◄────────┘  (free stack, else evict LRU)
//!     ├─ source.read_at(page)          no lock held
//!     ├─ copy out of the fetched page
//!     └─ bucket.install(key, slot)     loser of a concurrent fetch is freed
//! ```
//!
//! ## Example
//!
//! ```
//! use pagecache::PageCacheBuilder;
//!
//! let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
//! let cache = PageCacheBuilder::new().page_size(512).page_count(64).build().unwrap();
//! let file = cache.wrap(1, data.clone(), data.len() as i64);
//!
//! let mut buf = [0u8; 100];
//! assert_eq!(file.read_at(&mut buf, 1024).unwrap(), 100);
//! assert_eq!(&buf[..], &data[1024..1124]);
//!
//! // Same range again is served from memory: one page, one hit.
//! file.read_at(&mut buf, 1024).unwrap();
//! assert_eq!(cache.stats().hits, 1);
//!
//! // A range straddling two pages looks up both.
//! file.read_at(&mut buf, 1000).unwrap();
//! assert_eq!(&buf[..], &data[1000..1100]);
//! assert_eq!(cache.stats().lookups, 4);
//! ```

mod bucket;
pub mod reader;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::builder::{Geometry, PageCacheBuilder, PageCacheConfig, SHARD_COUNT};
use crate::ds::ShardSelector;
use crate::error::ConfigError;
use crate::metrics::PageCacheStats;
use crate::source::ReadAt;

pub(crate) use bucket::Bucket;
pub use reader::{CachedCursor, CachedReader};

/// Cache key: one page of one logical object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region {
    pub object_id: u32,
    pub page_index: u32,
}

impl Region {
    pub fn new(object_id: u32, page_index: u32) -> Self {
        Self {
            object_id,
            page_index,
        }
    }

    /// Little-endian encoding hashed for shard placement.
    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.object_id.to_le_bytes());
        bytes[4..].copy_from_slice(&self.page_index.to_le_bytes());
        bytes
    }
}

/// Shared handle to a sharded page cache.
///
/// Cloning is cheap and every clone refers to the same pages.
#[derive(Clone)]
pub struct PageCache {
    inner: Arc<Inner>,
}

struct Inner {
    buckets: Box<[Bucket]>,
    selector: ShardSelector,
    geometry: Geometry,
}

impl PageCache {
    /// Allocates a cache with the given configuration.
    ///
    /// The page size is rounded up to a power of two and the page count up to
    /// a multiple of [`SHARD_COUNT`]; every page is allocated here.
    pub fn new(config: PageCacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let buckets = (0..SHARD_COUNT)
            .map(|_| Bucket::new(geometry.pages_per_bucket, geometry.page_shift))
            .collect();
        let selector = ShardSelector::with_random_seed(SHARD_COUNT);

        debug!(
            page_size = geometry.page_size(),
            page_count = geometry.page_count,
            shards = SHARD_COUNT,
            pages_per_bucket = geometry.pages_per_bucket,
            "page cache allocated"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                buckets,
                selector,
                geometry,
            }),
        })
    }

    /// Starts a [`PageCacheBuilder`].
    pub fn builder() -> PageCacheBuilder {
        PageCacheBuilder::new()
    }

    /// Effective page size in bytes (a power of two).
    pub fn page_size(&self) -> usize {
        self.inner.geometry.page_size()
    }

    pub(crate) fn page_shift(&self) -> u32 {
        self.inner.geometry.page_shift
    }

    /// Effective number of pages (a multiple of the shard count).
    pub fn page_count(&self) -> usize {
        self.inner.geometry.page_count
    }

    pub fn shard_count(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Total bytes of page memory.
    pub fn capacity_bytes(&self) -> usize {
        self.page_size() * self.page_count()
    }

    /// Bucket index owning `(object_id, page_index)`.
    ///
    /// Stable for the lifetime of this cache; a different cache (or the same
    /// configuration in another process) places keys differently.
    pub fn shard_of(&self, object_id: u32, page_index: u32) -> usize {
        self.shard_of_region(Region::new(object_id, page_index))
    }

    fn shard_of_region(&self, key: Region) -> usize {
        self.inner.selector.shard_for_key(&key.to_le_bytes())
    }

    pub(crate) fn bucket(&self, key: Region) -> &Bucket {
        &self.inner.buckets[self.shard_of_region(key)]
    }

    /// Wraps `source` as a cached view of its first `size` bytes.
    ///
    /// Wrappers sharing an `object_id` share cached pages, so the id must
    /// identify the content, not the handle. A negative `size` is treated
    /// as empty.
    pub fn wrap<R: ReadAt>(&self, object_id: u32, source: R, size: i64) -> CachedReader<R> {
        CachedReader::new(self.clone(), object_id, source, size.max(0))
    }

    /// Sums the statistics of every bucket.
    pub fn stats(&self) -> PageCacheStats {
        self.inner.buckets.iter().map(Bucket::stats).sum()
    }

    /// Pages currently holding published content.
    pub fn resident_pages(&self) -> usize {
        self.inner.buckets.iter().map(Bucket::len).sum()
    }

    /// Pages sitting on free stacks.
    pub fn free_pages(&self) -> usize {
        self.inner.buckets.iter().map(Bucket::free_len).sum()
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        for bucket in self.inner.buckets.iter() {
            assert_eq!(bucket.capacity(), self.inner.geometry.pages_per_bucket);
            bucket.debug_validate_invariants();
        }
    }
}

impl fmt::Debug for PageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCache")
            .field("page_size", &self.page_size())
            .field("page_count", &self.page_count())
            .field("shards", &self.shard_count())
            .finish()
    }
}
