//! Exchange payload types
//!
//! Registry metadata as the agent caches it: node definitions, node and
//! service policies, and service definitions with their dependency
//! declarations.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Node Definition ==
/// A node as registered in the Exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeDefinition {
    pub name: String,
    pub owner: String,
    /// `device` or `cluster`
    pub node_type: String,
    pub pattern: String,
    pub arch: String,
    pub public_key: String,
    pub last_heartbeat: String,
}

// == Policy ==
/// A single policy property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Policy document attached to a node or service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangePolicy {
    pub properties: Vec<Property>,
    pub constraints: Vec<String>,
    pub last_updated: String,
}

/// Policy of a node; lives in the node policy partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePolicy(pub ExchangePolicy);

/// Policy of one service version; lives in the service policy partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePolicy(pub ExchangePolicy);

impl Deref for NodePolicy {
    type Target = ExchangePolicy;

    fn deref(&self) -> &ExchangePolicy {
        &self.0
    }
}

impl Deref for ServicePolicy {
    type Target = ExchangePolicy;

    fn deref(&self) -> &ExchangePolicy {
        &self.0
    }
}

// == Service Type ==
/// Where a service's workload runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Node-hosted (container on an edge device)
    #[default]
    Device,
    /// Cluster-hosted (operator on an edge cluster)
    Cluster,
    /// Provides both deployments
    Both,
}

impl ServiceType {
    /// Derives the kind from the two deployment descriptions.
    pub fn from_deployments(deployment: &Value, cluster_deployment: &Value) -> Self {
        if deployment_is_empty(cluster_deployment) {
            ServiceType::Device
        } else if deployment_is_empty(deployment) {
            ServiceType::Cluster
        } else {
            ServiceType::Both
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Device => "device",
            ServiceType::Cluster => "cluster",
            ServiceType::Both => "both",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment is empty when it is `null`, `""` or `{}`.
pub fn deployment_is_empty(deployment: &Value) -> bool {
    match deployment {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// == Service Dependency ==
/// A required-service reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDependency {
    pub url: String,
    pub org: String,
    /// Legacy single-version field
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub version_range: String,
    pub arch: String,
}

impl ServiceDependency {
    pub fn new(org: &str, url: &str, version_range: &str, arch: &str) -> Self {
        Self {
            url: url.to_string(),
            org: org.to_string(),
            version: String::new(),
            version_range: version_range.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The version constraint, falling back to the legacy `version` field.
    pub fn version_range(&self) -> &str {
        if self.version_range.is_empty() {
            &self.version
        } else {
            &self.version_range
        }
    }
}

impl fmt::Display for ServiceDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} {}",
            self.org,
            self.url,
            self.version_range(),
            self.arch
        )
    }
}

// == User Input ==
/// A variable a service expects to be configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInput {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub default_value: String,
}

// == Service Definition ==
/// One version of a service as published in the Exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub owner: String,
    pub label: String,
    pub description: String,
    pub public: bool,
    pub url: String,
    pub version: String,
    pub arch: String,
    pub sharable: String,
    pub required_services: Vec<ServiceDependency>,
    pub user_input: Vec<UserInput>,
    pub deployment: Value,
    pub deployment_signature: String,
    pub cluster_deployment: Value,
    pub cluster_deployment_signature: String,
    pub last_updated: String,
}

impl ServiceDefinition {
    pub fn service_type(&self) -> ServiceType {
        ServiceType::from_deployments(&self.deployment, &self.cluster_deployment)
    }

    pub fn has_dependencies(&self) -> bool {
        !self.required_services.is_empty()
    }
}

/// Every cached version of one `org/url/arch`, keyed by version string.
pub type ServiceVersions = BTreeMap<String, ServiceDefinition>;

/// Stable identity of a resolved service version.
pub fn service_identity(org: &str, url: &str, version: &str, arch: &str) -> String {
    format!("{}/{}_{}_{}", org, url, version, arch)
}
