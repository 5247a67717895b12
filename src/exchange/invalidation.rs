//! Change-driven cache invalidation
//!
//! Maps one Exchange change event onto deletions in the resource cache.
//! The engine keeps no state of its own.

use tracing::{debug, info, warn};

use crate::cache::keys::{belongs_to_org, decode_key, node_key, DecodedKey};
use crate::cache::{ResourceCache, ResourceType};
use crate::exchange::{ChangeEvent, ChangeOperation, ChangeResource, ServiceChangeId};

/// Applies `event` to `cache` and returns the number of entries removed.
///
/// `excluded_id` names a composite key (e.g. the agent's own `org/nodeId`)
/// that is never removed, in any partition. An empty string means no
/// exemption.
pub fn invalidate(cache: &ResourceCache, event: &ChangeEvent, excluded_id: Option<&str>) -> usize {
    let excluded = excluded_id.filter(|id| !id.is_empty());

    let removed = match (event.resource, event.operation) {
        (ChangeResource::Node, _) => {
            let key = node_key(&event.org_id, event.resource_id());
            purge(cache, ResourceType::NodeDefinition, excluded, |k| k == key)
                + purge(cache, ResourceType::NodePolicy, excluded, |k| k == key)
        }
        (ChangeResource::NodePolicy, _) => {
            let key = node_key(&event.org_id, event.resource_id());
            purge(cache, ResourceType::NodePolicy, excluded, |k| k == key)
        }
        (ChangeResource::Service, _) => match event.service_id() {
            Some(id) => {
                purge_service_definitions(cache, &event.org_id, &id, excluded)
                    + purge_service_policies(cache, &event.org_id, &id, excluded)
            }
            None => undecodable(event),
        },
        (ChangeResource::ServicePolicy, _) => match event.service_id() {
            Some(id) => purge_service_policies(cache, &event.org_id, &id, excluded),
            None => undecodable(event),
        },
        (ChangeResource::Org, ChangeOperation::Created) => {
            let removed: usize = ResourceType::ALL
                .iter()
                .map(|rt| purge(cache, *rt, excluded, |k| belongs_to_org(k, &event.org_id)))
                .sum();
            info!(org = %event.org_id, removed, "organization reset, cached entries purged");
            removed
        }
        (ChangeResource::Org, _) | (ChangeResource::Policy, _) | (ChangeResource::Other, _) => {
            debug!(?event, "change event ignored");
            0
        }
    };

    if removed > 0 {
        debug!(
            org = %event.org_id,
            id = %event.id,
            resource = ?event.resource,
            removed,
            "cache invalidated from change"
        );
    }
    removed
}

/// Deletes matching keys of one partition, sparing the excluded key.
fn purge<F>(cache: &ResourceCache, resource_type: ResourceType, excluded: Option<&str>, matches: F) -> usize
where
    F: Fn(&str) -> bool,
{
    cache
        .delete_where(resource_type, |key| matches(key) && excluded != Some(key))
        .len()
}

fn purge_service_definitions(
    cache: &ResourceCache,
    org: &str,
    id: &ServiceChangeId<'_>,
    excluded: Option<&str>,
) -> usize {
    purge(cache, ResourceType::ServiceDefinition, excluded, |key| {
        matches!(
            decode_key(ResourceType::ServiceDefinition, key),
            Some(DecodedKey::Service { org: o, url, arch })
                if o == org && arch == id.arch && id.matches_url(url)
        )
    })
}

fn purge_service_policies(
    cache: &ResourceCache,
    org: &str,
    id: &ServiceChangeId<'_>,
    excluded: Option<&str>,
) -> usize {
    purge(cache, ResourceType::ServicePolicy, excluded, |key| {
        matches!(
            decode_key(ResourceType::ServicePolicy, key),
            Some(DecodedKey::ServicePolicy { org: o, url, arch, version })
                if o == org && arch == id.arch && version == id.version && id.matches_url(url)
        )
    })
}

fn undecodable(event: &ChangeEvent) -> usize {
    warn!(id = %event.id, resource = ?event.resource, "undecodable service id in change event, ignored");
    0
}
