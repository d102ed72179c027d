use crate::metrics::snapshot::PageCacheStats;
use crate::metrics::traits::{MetricsSnapshotProvider, PageMetricsRecorder};

/// Per-bucket counters. Plain integers: the owning bucket's mutex is the
/// only writer and reader.
#[derive(Debug, Default)]
pub struct BucketMetrics {
    pub lookups: u64,
    pub hits: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub allocations: u64,
    pub frees: u64,
}

impl PageMetricsRecorder for BucketMetrics {
    #[inline]
    fn record_lookup(&mut self, hit: bool) {
        self.lookups += 1;
        if hit {
            self.hits += 1;
        }
    }

    #[inline]
    fn record_insert(&mut self) {
        self.inserts += 1;
    }

    #[inline]
    fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    fn record_allocation(&mut self) {
        self.allocations += 1;
    }

    #[inline]
    fn record_free(&mut self) {
        self.frees += 1;
    }
}

impl MetricsSnapshotProvider<PageCacheStats> for BucketMetrics {
    fn snapshot(&self) -> PageCacheStats {
        PageCacheStats {
            lookups: self.lookups,
            hits: self.hits,
            inserts: self.inserts,
            evictions: self.evictions,
            allocations: self.allocations,
            frees: self.frees,
        }
    }
}
