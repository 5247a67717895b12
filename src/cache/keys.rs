//! Composite Key Module
//!
//! Resource-type tags and the composite key format of each partition.
//! The organization is always the first `/`-separated segment of a key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

// == Resource Type ==
/// Closed set of cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// `org/nodeId`
    NodeDefinition,
    /// `org/nodeId`
    NodePolicy,
    /// `org/url/arch`, value groups every known version
    ServiceDefinition,
    /// `org/url/arch/version`
    ServicePolicy,
}

impl ResourceType {
    /// Every partition, in a stable order.
    pub const ALL: [ResourceType; 4] = [
        ResourceType::NodeDefinition,
        ResourceType::NodePolicy,
        ResourceType::ServiceDefinition,
        ResourceType::ServicePolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::NodeDefinition => "node_definition",
            ResourceType::NodePolicy => "node_policy",
            ResourceType::ServiceDefinition => "service_definition",
            ResourceType::ServicePolicy => "service_policy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node_definition" | "node_def" | "nodes" => Ok(ResourceType::NodeDefinition),
            "node_policy" | "node_pol" => Ok(ResourceType::NodePolicy),
            "service_definition" | "service_def" | "services" => {
                Ok(ResourceType::ServiceDefinition)
            }
            "service_policy" | "service_pol" => Ok(ResourceType::ServicePolicy),
            other => Err(ExchangeError::UnknownResourceType(other.to_string())),
        }
    }
}

// == Key Builders ==
/// Key for the node definition and node policy partitions.
pub fn node_key(org: &str, node_id: &str) -> String {
    format!("{}/{}", org, node_id)
}

/// Key for the service definition partition.
pub fn service_key(org: &str, url: &str, arch: &str) -> String {
    format!("{}/{}/{}", org, url, arch)
}

/// Key for the service policy partition.
pub fn service_policy_key(org: &str, url: &str, arch: &str, version: &str) -> String {
    format!("{}/{}/{}/{}", org, url, arch, version)
}

// == Organization Segment ==
/// Returns the leading organization segment of a composite key.
pub fn org_of(key: &str) -> &str {
    key.split_once('/').map_or(key, |(org, _)| org)
}

/// True when the key's whole leading segment equals `org`.
///
/// `e2e` does not match `e2edev/node-1`.
pub fn belongs_to_org(key: &str, org: &str) -> bool {
    org_of(key) == org
}

// == Decoding ==
/// Components of a composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedKey<'a> {
    Node {
        org: &'a str,
        id: &'a str,
    },
    Service {
        org: &'a str,
        url: &'a str,
        arch: &'a str,
    },
    ServicePolicy {
        org: &'a str,
        url: &'a str,
        arch: &'a str,
        version: &'a str,
    },
}

/// Splits a key according to its partition's shape.
///
/// Service URLs may themselves contain `/`, so the URL is whatever lies
/// between the org segment and the trailing arch (and version) segments.
pub fn decode_key(resource_type: ResourceType, key: &str) -> Option<DecodedKey<'_>> {
    let (org, rest) = key.split_once('/')?;
    match resource_type {
        ResourceType::NodeDefinition | ResourceType::NodePolicy => {
            (!rest.is_empty()).then_some(DecodedKey::Node { org, id: rest })
        }
        ResourceType::ServiceDefinition => {
            let (url, arch) = rest.rsplit_once('/')?;
            (!url.is_empty()).then_some(DecodedKey::Service { org, url, arch })
        }
        ResourceType::ServicePolicy => {
            let (rest, version) = rest.rsplit_once('/')?;
            let (url, arch) = rest.rsplit_once('/')?;
            (!url.is_empty()).then_some(DecodedKey::ServicePolicy {
                org,
                url,
                arch,
                version,
            })
        }
    }
}
