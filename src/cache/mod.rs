//! Cache Module
//!
//! In-memory Exchange metadata cache: a generic keyed store, composite key
//! handling, and the four-partition resource cache with read-time freshness.

mod entry;
mod keyed;
pub mod keys;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use keyed::KeyedCache;
pub use keys::ResourceType;
pub use stats::{CacheStats, PartitionCounters};
pub use store::{CachedResource, Partition, ResourceCache, DEFAULT_MAX_AGE};
