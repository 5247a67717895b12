//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheStats, ResourceType};

/// Response body for a cached read
#[derive(Debug, Clone, Serialize)]
pub struct CachedResponse<V> {
    /// Composite key the value is stored under
    pub key: String,
    /// Seconds since the value was stored
    pub age_seconds: u64,
    pub value: Arc<V>,
}

/// Response body for PUT operations
#[derive(Debug, Clone, Serialize)]
pub struct StoredResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
}

impl StoredResponse {
    pub fn new(resource_type: ResourceType, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("{} '{}' cached", resource_type, key),
            key,
        }
    }
}

/// Response body for DELETE of a single entry
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// False when nothing was cached under the key
    pub deleted: bool,
}

/// Response body for `GET /partitions/:type/keys`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub resource_type: ResourceType,
    pub keys: Vec<String>,
}

/// Response body for `DELETE /partitions/:type/orgs/:org`
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub resource_type: ResourceType,
    pub org: String,
    pub removed: usize,
}

/// Statistics of one partition
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Fresh hits over all reads
    pub hit_rate: f64,
}

impl From<CacheStats> for PartitionStats {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Keyed by partition name
    pub partitions: BTreeMap<String, PartitionStats>,
    /// Entries across every partition
    pub total_entries: usize,
}

impl StatsResponse {
    pub fn new(partitions: impl IntoIterator<Item = (ResourceType, CacheStats)>) -> Self {
        let partitions: BTreeMap<String, PartitionStats> = partitions
            .into_iter()
            .map(|(rt, stats)| (rt.to_string(), PartitionStats::from(stats)))
            .collect();
        let total_entries = partitions.values().map(|p| p.stats.total_entries).sum();
        Self {
            partitions,
            total_entries,
        }
    }
}

/// Response body for `POST /changes`
#[derive(Debug, Clone, Serialize)]
pub struct ChangeAccepted {
    pub message: String,
}

impl ChangeAccepted {
    pub fn new(org: &str, id: &str) -> Self {
        Self {
            message: format!("Change for {}/{} queued", org, id),
        }
    }
}

/// Response body for `POST /services/validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    /// Identities of every dependency reached
    pub dependencies: Vec<String>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
