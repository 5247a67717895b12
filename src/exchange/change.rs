//! Exchange change events
//!
//! Notifications the Exchange emits when a resource is created, modified or
//! deleted. Unknown resource or operation names deserialize to `Other` so
//! newer event shapes pass through harmlessly.

use serde::{Deserialize, Serialize};

// == Change Resource ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeResource {
    Node,
    NodePolicy,
    Service,
    ServicePolicy,
    /// Deployment policy; nothing cached depends on it
    Policy,
    Org,
    #[serde(other)]
    Other,
}

// == Change Operation ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Created,
    CreatedModified,
    #[serde(alias = "changed")]
    Modified,
    Deleted,
    #[default]
    #[serde(other)]
    Other,
}

// == Change Event ==
/// One change notification. Consumed once by the invalidation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub org_id: String,
    pub id: String,
    pub resource: ChangeResource,
    #[serde(default)]
    pub operation: ChangeOperation,
}

impl ChangeEvent {
    pub fn new(
        org_id: impl Into<String>,
        id: impl Into<String>,
        resource: ChangeResource,
        operation: ChangeOperation,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            id: id.into(),
            resource,
            operation,
        }
    }

    /// The resource id without a leading `org/` qualifier.
    pub fn resource_id(&self) -> &str {
        self.id
            .strip_prefix(self.org_id.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.id)
    }

    /// An organization was (re)created: every cached fact about it is suspect.
    pub fn is_org_reset(&self) -> bool {
        self.resource == ChangeResource::Org && self.operation == ChangeOperation::Created
    }

    /// Decodes the id of a service or service policy event.
    pub fn service_id(&self) -> Option<ServiceChangeId<'_>> {
        ServiceChangeId::parse(self.resource_id())
    }
}

// == Service Change Id ==
/// Components of an Exchange service id `<url-form>_<version>_<arch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChangeId<'a> {
    /// URL in Exchange id form, see [`exchange_url_form`]
    pub url_form: &'a str,
    pub version: &'a str,
    pub arch: &'a str,
}

impl<'a> ServiceChangeId<'a> {
    /// Splits from the right, since the URL part may itself contain `_`.
    pub fn parse(id: &'a str) -> Option<Self> {
        let mut parts = id.rsplitn(3, '_');
        let arch = parts.next().filter(|s| !s.is_empty())?;
        let version = parts.next().filter(|s| !s.is_empty())?;
        let url_form = parts.next().filter(|s| !s.is_empty())?;
        Some(Self {
            url_form,
            version,
            arch,
        })
    }

    /// True when a cached service URL denotes this service.
    pub fn matches_url(&self, url: &str) -> bool {
        url == self.url_form || exchange_url_form(url) == self.url_form
    }
}

/// The Exchange's id form of a service URL: scheme dropped, `/` turned into `-`.
pub fn exchange_url_form(url: &str) -> String {
    let bare = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    bare.replace('/', "-")
}
