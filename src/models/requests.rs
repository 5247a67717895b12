//! Request DTOs for the admin API
//!
//! Query strings and bodies of incoming HTTP requests. Resource payloads
//! themselves (node definitions, policies, service files) are the exchange
//! types and are deserialized directly.

use serde::Deserialize;

/// Checks one composite-key component: non-empty and free of `/`.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_segment(name: &str, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(format!("{} cannot be empty", name));
    }
    if value.contains('/') {
        return Some(format!("{} cannot contain '/'", name));
    }
    None
}

/// Checks a service URL: non-empty. URLs keep their `/`.
pub fn validate_url(url: &str) -> Option<String> {
    url.trim()
        .is_empty()
        .then(|| "url cannot be empty".to_string())
}

fn first_invalid(segments: &[(&str, &str)]) -> Option<String> {
    segments
        .iter()
        .find_map(|(name, value)| validate_segment(name, value))
}

/// Optional freshness bound on reads (`?max_age=`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaxAgeQuery {
    /// Seconds; falls back to the configured default
    #[serde(default)]
    pub max_age: Option<u64>,
}

/// Query for `/services`
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceQuery {
    pub org: String,
    pub url: String,
    pub arch: String,
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl ServiceQuery {
    pub fn validate(&self) -> Option<String> {
        validate_segment("org", &self.org)
            .or_else(|| validate_url(&self.url))
            .or_else(|| validate_segment("arch", &self.arch))
    }
}

/// Query for `/service-policies`
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePolicyQuery {
    pub org: String,
    pub url: String,
    pub arch: String,
    pub version: String,
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl ServicePolicyQuery {
    pub fn validate(&self) -> Option<String> {
        validate_segment("org", &self.org)
            .or_else(|| validate_url(&self.url))
            .or_else(|| {
                first_invalid(&[
                    ("arch", self.arch.as_str()),
                    ("version", self.version.as_str()),
                ])
            })
    }
}
