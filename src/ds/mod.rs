//! Building blocks shared by the eviction index and the page cache.

pub mod intrusive_list;
pub mod shard;
pub mod slot_arena;

pub use intrusive_list::IntrusiveList;
pub use shard::ShardSelector;
pub use slot_arena::{SlotArena, SlotId};
