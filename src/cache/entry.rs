//! Cache Entry Module
//!
//! Defines the structure for individual cache entries. An entry only records
//! when it was stored; freshness is decided by the reader.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached payload together with its write timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Write timestamp (Unix milliseconds)
    pub stored_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: V) -> Self {
        Self::with_timestamp(value, current_timestamp_ms())
    }

    /// Creates a cache entry with an explicit write timestamp.
    pub fn with_timestamp(value: V, stored_at: u64) -> Self {
        Self { value, stored_at }
    }

    // == Age ==
    /// Whole seconds elapsed between `stored_at` and `now_ms`.
    ///
    /// A clock that moved backwards yields an age of zero.
    pub fn age_seconds_at(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at) / 1000
    }

    /// Whole seconds elapsed since the entry was stored.
    pub fn age_seconds(&self) -> u64 {
        self.age_seconds_at(current_timestamp_ms())
    }

    // == Freshness ==
    /// Checks the entry against a caller-supplied freshness bound.
    ///
    /// Boundary condition: an entry whose age equals `max_age` is still fresh.
    /// With `max_age == 0` an entry is fresh for the first second after the
    /// write, so an immediate read-after-write always hits.
    pub fn is_fresh_at(&self, now_ms: u64, max_age: u64) -> bool {
        self.age_seconds_at(now_ms) <= max_age
    }

    /// Checks freshness against the current time.
    pub fn is_fresh(&self, max_age: u64) -> bool {
        self.is_fresh_at(current_timestamp_ms(), max_age)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
