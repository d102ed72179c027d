pub use crate::builder::{PageCacheBuilder, PageCacheConfig};
pub use crate::error::{ConfigError, PageCacheError, ReadError};
pub use crate::metrics::PageCacheStats;
pub use crate::pagecache::{CachedReader, PageCache};
pub use crate::source::ReadAt;
pub use crate::traits::EvictionIndex;
