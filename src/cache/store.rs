//! Resource Cache Module
//!
//! Typed, freshness-aware facade over four keyed partitions: node
//! definitions, node policies, service definitions and service policies.
//! Staleness is evaluated when an entry is read, against the bound the
//! caller passes; nothing is evicted for age.

use std::sync::Arc;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::keys::{belongs_to_org, node_key, service_key, service_policy_key};
use crate::cache::{CacheEntry, CacheStats, KeyedCache, PartitionCounters, ResourceType};
use crate::exchange::{NodeDefinition, NodePolicy, ServicePolicy, ServiceVersions};

/// Default freshness bound for the typed accessors, in seconds
pub const DEFAULT_MAX_AGE: u64 = 60;

// == Cached Resource ==
/// Payload types that own a partition of the [`ResourceCache`].
pub trait CachedResource: Send + Sync + Sized + 'static {
    /// Tag of the partition holding this payload type.
    const RESOURCE_TYPE: ResourceType;

    /// Selects this payload's partition.
    fn partition(cache: &ResourceCache) -> &Partition<Self>;
}

impl CachedResource for NodeDefinition {
    const RESOURCE_TYPE: ResourceType = ResourceType::NodeDefinition;

    fn partition(cache: &ResourceCache) -> &Partition<Self> {
        &cache.nodes
    }
}

impl CachedResource for NodePolicy {
    const RESOURCE_TYPE: ResourceType = ResourceType::NodePolicy;

    fn partition(cache: &ResourceCache) -> &Partition<Self> {
        &cache.node_policies
    }
}

impl CachedResource for ServiceVersions {
    const RESOURCE_TYPE: ResourceType = ResourceType::ServiceDefinition;

    fn partition(cache: &ResourceCache) -> &Partition<Self> {
        &cache.services
    }
}

impl CachedResource for ServicePolicy {
    const RESOURCE_TYPE: ResourceType = ResourceType::ServicePolicy;

    fn partition(cache: &ResourceCache) -> &Partition<Self> {
        &cache.service_policies
    }
}

// == Partition ==
/// One resource-type partition: a keyed cache of timestamped payloads plus
/// its read counters.
#[derive(Debug)]
pub struct Partition<V> {
    store: KeyedCache<CacheEntry<Arc<V>>>,
    counters: PartitionCounters,
}

impl<V> Partition<V> {
    fn new() -> Self {
        Self {
            store: KeyedCache::new(),
            counters: PartitionCounters::new(),
        }
    }
}

/// Operations that do not depend on the payload type.
trait PartitionOps: Send + Sync {
    fn delete(&self, key: &str) -> bool;
    fn remove_where(&self, predicate: &mut dyn FnMut(&str) -> bool) -> Vec<String>;
    fn keys(&self) -> Vec<String>;
    fn len(&self) -> usize;
    fn entry_age(&self, key: &str) -> Option<u64>;
    fn stats(&self) -> CacheStats;
}

impl<V: Send + Sync> PartitionOps for Partition<V> {
    fn delete(&self, key: &str) -> bool {
        self.store.delete(key)
    }

    fn remove_where(&self, predicate: &mut dyn FnMut(&str) -> bool) -> Vec<String> {
        let removed = self.store.remove_where(|key| predicate(key));
        self.counters.record_invalidated(removed.len());
        removed
    }

    fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn entry_age(&self, key: &str) -> Option<u64> {
        self.store.get(key).map(|entry| entry.age_seconds())
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.store.len())
    }
}

// == Resource Cache ==
/// Read-through cache for Exchange metadata.
#[derive(Debug)]
pub struct ResourceCache {
    nodes: Partition<NodeDefinition>,
    node_policies: Partition<NodePolicy>,
    services: Partition<ServiceVersions>,
    service_policies: Partition<ServicePolicy>,
    /// Freshness bound used by the typed accessors
    default_max_age: u64,
}

impl ResourceCache {
    // == Constructor ==
    /// Creates an empty cache whose typed accessors tolerate `default_max_age`
    /// seconds of staleness.
    pub fn new(default_max_age: u64) -> Self {
        Self {
            nodes: Partition::new(),
            node_policies: Partition::new(),
            services: Partition::new(),
            service_policies: Partition::new(),
            default_max_age,
        }
    }

    pub fn default_max_age(&self) -> u64 {
        self.default_max_age
    }

    fn ops(&self, resource_type: ResourceType) -> &dyn PartitionOps {
        match resource_type {
            ResourceType::NodeDefinition => &self.nodes,
            ResourceType::NodePolicy => &self.node_policies,
            ResourceType::ServiceDefinition => &self.services,
            ResourceType::ServicePolicy => &self.service_policies,
        }
    }

    // == Update ==
    /// Stores `value` under `key` in the payload's partition, stamped with
    /// the current time. Always overwrites.
    pub fn update<V: CachedResource>(&self, key: impl Into<String>, value: V) {
        self.update_shared(key, Arc::new(value));
    }

    /// Like [`update`](Self::update) for a payload that is already shared.
    pub fn update_shared<V: CachedResource>(&self, key: impl Into<String>, value: Arc<V>) {
        let key = key.into();
        debug!(partition = V::RESOURCE_TYPE.as_str(), key = %key, "cache update");
        V::partition(self).store.put(key, CacheEntry::new(value));
    }

    // == Read ==
    /// Returns the cached value if it is at most `max_age` whole seconds old.
    ///
    /// A stale entry is left in place: another caller with a larger
    /// tolerance may still be served it.
    pub fn read<V: CachedResource>(&self, key: &str, max_age: u64) -> Option<Arc<V>> {
        let partition = V::partition(self);
        match partition.store.get(key) {
            Some(entry) if entry.is_fresh_at(current_timestamp_ms(), max_age) => {
                partition.counters.record_hit();
                Some(entry.value)
            }
            Some(_) => {
                debug!(partition = V::RESOURCE_TYPE.as_str(), key, max_age, "cache entry stale");
                partition.counters.record_stale();
                None
            }
            None => {
                partition.counters.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes one entry. Deleting an absent key is a no-op.
    pub fn delete(&self, resource_type: ResourceType, key: &str) -> bool {
        let removed = self.ops(resource_type).delete(key);
        if removed {
            debug!(partition = %resource_type, key, "cache delete");
        }
        removed
    }

    /// Removes every entry of the partition whose key matches `predicate`,
    /// counting them as invalidated. Returns the removed keys.
    pub fn delete_where<F>(&self, resource_type: ResourceType, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.ops(resource_type).remove_where(&mut predicate)
    }

    // == Delete By Organization ==
    /// Removes every entry of the partition belonging to `org`.
    pub fn delete_by_organization(&self, resource_type: ResourceType, org: &str) -> usize {
        let removed = self.delete_where(resource_type, |key| belongs_to_org(key, org));
        debug!(partition = %resource_type, org, removed = removed.len(), "organization purge");
        removed.len()
    }

    // == Diagnostics ==
    /// Snapshot of the partition's keys.
    pub fn keys(&self, resource_type: ResourceType) -> Vec<String> {
        self.ops(resource_type).keys()
    }

    pub fn len(&self, resource_type: ResourceType) -> usize {
        self.ops(resource_type).len()
    }

    /// Total entries across all partitions.
    pub fn total_len(&self) -> usize {
        ResourceType::ALL.iter().map(|rt| self.len(*rt)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Seconds since the entry was stored, if present.
    pub fn entry_age(&self, resource_type: ResourceType, key: &str) -> Option<u64> {
        self.ops(resource_type).entry_age(key)
    }

    pub fn stats(&self, resource_type: ResourceType) -> CacheStats {
        self.ops(resource_type).stats()
    }

    // == Node Accessors ==
    pub fn node_definition(&self, org: &str, node_id: &str) -> Option<Arc<NodeDefinition>> {
        self.read(&node_key(org, node_id), self.default_max_age)
    }

    pub fn update_node_definition(&self, org: &str, node_id: &str, node: NodeDefinition) {
        self.update(node_key(org, node_id), node);
    }

    pub fn node_policy(&self, org: &str, node_id: &str) -> Option<Arc<NodePolicy>> {
        self.read(&node_key(org, node_id), self.default_max_age)
    }

    pub fn update_node_policy(&self, org: &str, node_id: &str, policy: NodePolicy) {
        self.update(node_key(org, node_id), policy);
    }

    // == Service Accessors ==
    /// All cached versions of `org/url/arch`.
    pub fn service_definitions(
        &self,
        org: &str,
        url: &str,
        arch: &str,
    ) -> Option<Arc<ServiceVersions>> {
        self.read(&service_key(org, url, arch), self.default_max_age)
    }

    pub fn update_service_definitions(
        &self,
        org: &str,
        url: &str,
        arch: &str,
        versions: ServiceVersions,
    ) {
        self.update(service_key(org, url, arch), versions);
    }

    pub fn service_policy(
        &self,
        org: &str,
        url: &str,
        arch: &str,
        version: &str,
    ) -> Option<Arc<ServicePolicy>> {
        self.read(
            &service_policy_key(org, url, arch, version),
            self.default_max_age,
        )
    }

    pub fn update_service_policy(
        &self,
        org: &str,
        url: &str,
        arch: &str,
        version: &str,
        policy: ServicePolicy,
    ) {
        self.update(service_policy_key(org, url, arch, version), policy);
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}
