//! Page cache configuration and builder.
//!
//! Configuration is applied once at construction and is immutable afterwards.
//! Both knobs are rounded rather than rejected where a sensible value exists:
//! the page size goes up to the next power of two and the page count up to a
//! multiple of [`SHARD_COUNT`]. Zero values and geometries whose arena would
//! not fit in memory are rejected with a [`ConfigError`].
//!
//! ## Example
//!
//! ```rust
//! use pagecache::builder::PageCacheBuilder;
//!
//! let cache = PageCacheBuilder::new()
//!     .page_size(3000)
//!     .page_count(100)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cache.page_size(), 4096);
//! assert_eq!(cache.page_count(), 128);
//! ```

use crate::error::ConfigError;
use crate::pagecache::PageCache;

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages.
pub const DEFAULT_PAGE_COUNT: usize = 16384;

/// Number of independently locked buckets. A power of two so shard routing
/// is a mask; not configurable.
pub const SHARD_COUNT: usize = 64;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 1 << 30;

/// Requested cache geometry, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCacheConfig {
    pub page_size: usize,
    pub page_count: usize,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_count: DEFAULT_PAGE_COUNT,
        }
    }
}

impl PageCacheConfig {
    /// Validates and rounds the configuration into the geometry the cache
    /// actually uses.
    pub(crate) fn geometry(&self) -> Result<Geometry, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::new("page size must be > 0"));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::new(format!(
                "page size {} exceeds the maximum of {MAX_PAGE_SIZE} bytes",
                self.page_size
            )));
        }
        if self.page_count == 0 {
            return Err(ConfigError::new("page count must be > 0"));
        }

        let page_shift = self.page_size.next_power_of_two().trailing_zeros();
        let page_count = self
            .page_count
            .div_ceil(SHARD_COUNT)
            .checked_mul(SHARD_COUNT)
            .ok_or_else(|| ConfigError::new("page count overflows usize"))?;
        let pages_per_bucket = page_count / SHARD_COUNT;
        if u32::try_from(pages_per_bucket).is_err() {
            return Err(ConfigError::new(format!(
                "page count {page_count} exceeds {} pages per bucket",
                u32::MAX
            )));
        }
        (1usize << page_shift)
            .checked_mul(page_count)
            .ok_or_else(|| ConfigError::new("cache size overflows usize"))?;

        Ok(Geometry {
            page_shift,
            page_count,
            pages_per_bucket,
        })
    }
}

/// Effective geometry after rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub page_shift: u32,
    pub page_count: usize,
    pub pages_per_bucket: usize,
}

impl Geometry {
    pub fn page_size(&self) -> usize {
        1 << self.page_shift
    }
}

/// Builder for [`PageCache`] instances.
#[derive(Debug, Clone, Default)]
pub struct PageCacheBuilder {
    config: PageCacheConfig,
}

impl PageCacheBuilder {
    /// Starts from [`DEFAULT_PAGE_SIZE`] and [`DEFAULT_PAGE_COUNT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size; rounded up to a power of two.
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Sets the page count; rounded up to a multiple of [`SHARD_COUNT`].
    pub fn page_count(mut self, count: usize) -> Self {
        self.config.page_count = count;
        self
    }

    pub fn config(&self) -> &PageCacheConfig {
        &self.config
    }

    /// Allocates the cache.
    pub fn build(self) -> Result<PageCache, ConfigError> {
        PageCache::new(self.config)
    }
}
