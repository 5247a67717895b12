//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache and invalidation properties over
//! generated organizations, ids and operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::keys::{node_key, service_key, service_policy_key};
use crate::cache::{KeyedCache, ResourceCache, ResourceType};
use crate::exchange::{
    invalidate, ChangeEvent, ChangeOperation, ChangeResource, ExchangePolicy, NodeDefinition,
    NodePolicy, Property, ServiceDefinition, ServicePolicy, ServiceVersions,
};

// == Strategies ==
/// Generates one composite-key segment (no `/`)
fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}".prop_map(|s| s)
}

/// Generates payload text
fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,32}".prop_map(|s| s)
}

fn resource_type_strategy() -> impl Strategy<Value = ResourceType> {
    prop::sample::select(ResourceType::ALL.to_vec())
}

/// Two organizations with distinct names; one may prefix the other.
fn org_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (segment_strategy(), segment_strategy(), any::<bool>()).prop_map(|(a, b, nest)| {
        if nest || a == b {
            let prefixed = format!("{}{}", a, b);
            (a, prefixed)
        } else {
            (a, b)
        }
    })
}

fn node(pattern: &str) -> NodeDefinition {
    NodeDefinition {
        pattern: pattern.to_string(),
        ..Default::default()
    }
}

fn policy(tag: &str) -> ExchangePolicy {
    ExchangePolicy {
        properties: vec![Property::new("tag", tag)],
        ..Default::default()
    }
}

fn versions(url: &str, tag: &str) -> ServiceVersions {
    let mut versions = ServiceVersions::new();
    versions.insert(
        "1.0.0".to_string(),
        ServiceDefinition {
            url: url.to_string(),
            version: "1.0.0".to_string(),
            description: tag.to_string(),
            ..Default::default()
        },
    );
    versions
}

/// Stores `tag` under `key` in the partition of `resource_type`.
fn store(cache: &ResourceCache, resource_type: ResourceType, key: &str, tag: &str) {
    match resource_type {
        ResourceType::NodeDefinition => cache.update(key, node(tag)),
        ResourceType::NodePolicy => cache.update(key, NodePolicy(policy(tag))),
        ResourceType::ServiceDefinition => cache.update(key, versions("svc", tag)),
        ResourceType::ServicePolicy => cache.update(key, ServicePolicy(policy(tag))),
    }
}

/// Reads back the tag stored under `key`, if fresh within `max_age`.
fn load(cache: &ResourceCache, resource_type: ResourceType, key: &str, max_age: u64) -> Option<String> {
    let tag_of = |p: &ExchangePolicy| p.properties[0].value.as_str().map(str::to_string);
    match resource_type {
        ResourceType::NodeDefinition => cache
            .read::<NodeDefinition>(key, max_age)
            .map(|n| n.pattern.clone()),
        ResourceType::NodePolicy => cache
            .read::<NodePolicy>(key, max_age)
            .and_then(|p| tag_of(&p)),
        ResourceType::ServiceDefinition => cache
            .read::<ServiceVersions>(key, max_age)
            .map(|v| v["1.0.0"].description.clone()),
        ResourceType::ServicePolicy => cache
            .read::<ServicePolicy>(key, max_age)
            .and_then(|p| tag_of(&p)),
    }
}

/// Every partition's key shape for one organization.
fn org_keys(org: &str, id: &str) -> Vec<(ResourceType, String)> {
    vec![
        (ResourceType::NodeDefinition, node_key(org, id)),
        (ResourceType::NodePolicy, node_key(org, id)),
        (ResourceType::ServiceDefinition, service_key(org, id, "amd64")),
        (ResourceType::ServicePolicy, service_policy_key(org, id, "amd64", "1.0.0")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Write/read round-trip**
    // *For any* partition, key and value, an immediate zero-tolerance read
    // returns what was written.
    #[test]
    fn prop_roundtrip_storage(
        rt in resource_type_strategy(),
        org in segment_strategy(),
        id in segment_strategy(),
        tag in text_strategy(),
    ) {
        let cache = ResourceCache::default();
        let key = node_key(&org, &id);

        store(&cache, rt, &key, &tag);

        prop_assert_eq!(load(&cache, rt, &key, 0), Some(tag));
    }

    // **Overwrite visibility**
    // *For any* sequence of writes to one key, a read returns the last one.
    #[test]
    fn prop_overwrite_semantics(
        rt in resource_type_strategy(),
        key in segment_strategy(),
        tags in prop::collection::vec(text_strategy(), 1..10),
    ) {
        let cache = ResourceCache::default();
        for tag in &tags {
            store(&cache, rt, &key, tag);
        }

        prop_assert_eq!(load(&cache, rt, &key, 0), tags.last().cloned());
        prop_assert_eq!(cache.len(rt), 1);
    }

    // **Organization cascade scope**
    // *For any* two organizations, an org reset for the first removes all
    // of its entries in every partition and leaves the second untouched.
    #[test]
    fn prop_org_cascade_scope(
        (org_a, org_b) in org_pair_strategy(),
        ids in prop::collection::hash_set(segment_strategy(), 1..5),
        tag in text_strategy(),
    ) {
        let cache = ResourceCache::default();
        for id in &ids {
            for org in [&org_a, &org_b] {
                for (rt, key) in org_keys(org, id) {
                    store(&cache, rt, &key, &tag);
                }
            }
        }

        let event = ChangeEvent::new(org_a.as_str(), org_a.as_str(), ChangeResource::Org, ChangeOperation::Created);
        let removed = invalidate(&cache, &event, None);
        prop_assert_eq!(removed, ids.len() * 4);

        for id in &ids {
            for (rt, key) in org_keys(&org_a, id) {
                prop_assert_eq!(load(&cache, rt, &key, 60), None);
            }
            for (rt, key) in org_keys(&org_b, id) {
                prop_assert_eq!(load(&cache, rt, &key, 60), Some(tag.clone()));
            }
        }
    }

    // **Targeted delete scope**
    // *For any* population of nodes, a node change removes exactly the
    // definition and policy of that node and nothing else.
    #[test]
    fn prop_targeted_node_delete_scope(
        nodes in prop::collection::hash_set((segment_strategy(), segment_strategy()), 1..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let cache = ResourceCache::default();
        let nodes: Vec<(String, String)> = nodes.into_iter().collect();
        for (org, id) in &nodes {
            cache.update_node_definition(org, id, node(id));
            cache.update_node_policy(org, id, NodePolicy(policy(id)));
            cache.update_service_definitions(org, id, "amd64", versions(id, id));
        }

        let (target_org, target_id) = pick.get(&nodes).clone();
        let event = ChangeEvent::new(target_org.as_str(), target_id.as_str(), ChangeResource::Node, ChangeOperation::Modified);
        prop_assert_eq!(invalidate(&cache, &event, None), 2);

        for (org, id) in &nodes {
            let is_target = *org == target_org && *id == target_id;
            prop_assert_eq!(cache.node_definition(org, id).is_none(), is_target);
            prop_assert_eq!(cache.node_policy(org, id).is_none(), is_target);
            prop_assert!(cache.service_definitions(org, id, "amd64").is_some());
        }
    }

    // **Idempotent delete**
    // *For any* absent key, deleting it changes nothing and reports false.
    #[test]
    fn prop_delete_absent_is_noop(
        present in prop::collection::hash_set(segment_strategy(), 0..10),
        absent in "[A-Z]{1,8}",
        rt in resource_type_strategy(),
    ) {
        let cache = ResourceCache::default();
        for key in &present {
            store(&cache, rt, key, key);
        }

        prop_assert!(!cache.delete(rt, &absent));
        prop_assert!(!cache.delete(rt, &absent));
        prop_assert_eq!(cache.len(rt), present.len());
        let stats = cache.stats(rt);
        prop_assert_eq!(stats.invalidated, 0);
    }

    // **Keyed cache model**
    // *For any* sequence of puts and deletes, the keyed cache agrees with a
    // plain map.
    #[test]
    fn prop_keyed_cache_matches_model(
        ops in prop::collection::vec((segment_strategy(), prop::option::of(text_strategy())), 1..50),
    ) {
        let cache: KeyedCache<String> = KeyedCache::new();
        let mut model: HashMap<String, String> = HashMap::new();

        for (key, value) in ops {
            match value {
                Some(v) => {
                    cache.put(key.clone(), v.clone());
                    model.insert(key, v);
                }
                None => {
                    prop_assert_eq!(cache.delete(&key), model.remove(&key).is_some());
                }
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        for (key, value) in &model {
            let got = cache.get(key);
            prop_assert_eq!(got.as_ref(), Some(value));
        }
    }
}
