//! Cache Statistics Module
//!
//! Tracks per-partition read outcomes and invalidations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Partition Counters ==
/// Lock-free counters owned by one partition.
#[derive(Debug, Default)]
pub struct PartitionCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    invalidated: AtomicU64,
}

impl PartitionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Key was never stored or has been removed.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Stale ==
    /// Key was present but older than the caller's bound.
    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Invalidation ==
    pub fn record_invalidated(&self, count: usize) {
        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copies the counters into a serializable snapshot.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Cache Stats ==
/// Point-in-time statistics for one partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a fresh value
    pub hits: u64,
    /// Reads for keys that were not present
    pub misses: u64,
    /// Reads rejected by the caller's freshness bound
    pub stale: u64,
    /// Entries removed by change-driven invalidation
    pub invalidated: u64,
    /// Current number of entries in the partition
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses + stale), or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
