//! pagecache: a sharded, read-through page cache for random-access byte
//! sources.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod pagecache;
pub mod policy;
pub mod prelude;
pub mod source;
pub mod traits;

pub use crate::builder::{PageCacheBuilder, PageCacheConfig};
pub use crate::ds::{IntrusiveList, ShardSelector, SlotArena, SlotId};
pub use crate::error::{ConfigError, PageCacheError, ReadError};
pub use crate::metrics::PageCacheStats;
pub use crate::pagecache::{CachedCursor, CachedReader, PageCache, Region};
pub use crate::policy::lru::LruIndex;
pub use crate::source::ReadAt;
