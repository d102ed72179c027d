//! # Metrics Traits
//!
//! Recording and snapshotting are kept apart: buckets only write counters
//! through [`PageMetricsRecorder`] while holding their lock, and readers of
//! statistics only go through [`MetricsSnapshotProvider`].
//!
//! ```text
//!   ┌─────────────────────────────┐      ┌──────────────────────────────┐
//!   │    PageMetricsRecorder      │      │ MetricsSnapshotProvider<S>   │
//!   │  lookup / insert / evict    │      │  snapshot() → S              │
//!   │  allocation / free          │      │                              │
//!   └──────────────┬──────────────┘      └──────────────┬───────────────┘
//!                  └─────────────┬──────────────────────┘
//!                                ▼
//!                          BucketMetrics
//! ```

/// Counters a page-cache shard records under its lock.
pub trait PageMetricsRecorder {
    /// A key lookup; `hit` tells whether the page was resident.
    fn record_lookup(&mut self, hit: bool);
    /// A fetched page was published in the index.
    fn record_insert(&mut self);
    /// A resident page was reclaimed to make room.
    fn record_eviction(&mut self);
    /// A slot was taken from the free stack.
    fn record_allocation(&mut self);
    /// A slot went back to the free stack.
    fn record_free(&mut self);
}

/// Produces a point-in-time copy of recorded metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}
