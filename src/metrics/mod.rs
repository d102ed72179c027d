//! Cache statistics: per-bucket recorders and the aggregated snapshot.

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use metrics_impl::BucketMetrics;
pub use snapshot::PageCacheStats;
