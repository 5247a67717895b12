//! Service dependency validation
//!
//! Resolves each required service of a root descriptor through a lookup
//! capability and enforces deployment-type consistency: a cluster service
//! may not declare required services, and a device or both service may not
//! depend, directly or transitively, on a cluster service.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::exchange::{ServiceDefinition, ServiceType};
use crate::service::{ServiceSpec, VersionRange};

/// Resolved services keyed by `org/url_version_arch`.
pub type ResolvedDependencies = BTreeMap<String, ServiceDefinition>;

// == Resolved Service ==
/// What a lookup returns for one required-service reference.
#[derive(Debug, Clone, Default)]
pub struct ResolvedService {
    /// Transitive dependencies of `definition`, already resolved
    pub dependencies: ResolvedDependencies,
    /// The selected version of the requested service
    pub definition: ServiceDefinition,
    /// Identity of `definition`
    pub id: String,
}

// == Service Definition Resolver ==
/// Lookup capability: find the service matching `version_range` and its
/// dependency subtree.
///
/// Implemented by [`DependencyResolver`](crate::service::DependencyResolver)
/// and by any `Fn(url, org, version_range, arch)` closure.
pub trait ServiceDefResolver {
    fn resolve(&self, url: &str, org: &str, version_range: &str, arch: &str)
        -> Result<ResolvedService>;
}

impl<F> ServiceDefResolver for F
where
    F: Fn(&str, &str, &str, &str) -> Result<ResolvedService>,
{
    fn resolve(
        &self,
        url: &str,
        org: &str,
        version_range: &str,
        arch: &str,
    ) -> Result<ResolvedService> {
        self(url, org, version_range, arch)
    }
}

// == Validate ==
/// Validates `service`'s dependency graph and returns every distinct
/// dependency reached.
///
/// Required services are checked in declaration order and the first
/// failure aborts validation. A reference repeating an earlier
/// `(org, url, range, arch)` is looked up only once. Lookup failures are wrapped with the
/// offending reference and keep the original error as their source.
pub fn validate_service<R, S>(resolver: &R, service: &S) -> Result<ResolvedDependencies>
where
    R: ServiceDefResolver + ?Sized,
    S: ServiceSpec + ?Sized,
{
    let required = service.required_services();
    let mut resolved = ResolvedDependencies::new();
    let mut looked_up = HashSet::new();

    if service.service_type() == ServiceType::Cluster {
        if !required.is_empty() {
            return Err(ExchangeError::ClusterRequiredServices(service.identity()));
        }
        return Ok(resolved);
    }

    for dep in required {
        let constraint = dep.version_range();
        let range =
            VersionRange::parse(constraint).map_err(|source| ExchangeError::VersionConstraint {
                constraint: constraint.to_string(),
                service: dep.to_string(),
                source,
            })?;
        let range = range.to_string();
        if !looked_up.insert((dep.org.as_str(), dep.url.as_str(), range.clone(), dep.arch.as_str())) {
            continue;
        }

        let found = resolver
            .resolve(&dep.url, &dep.org, &range, &dep.arch)
            .map_err(|e| ExchangeError::Lookup {
                service: dep.to_string(),
                source: Box::new(e),
            })?;

        let service_type = found.definition.service_type();
        if service_type == ServiceType::Cluster {
            return Err(ExchangeError::WrongServiceType {
                service: found.id,
                service_type: service_type.to_string(),
            });
        }

        for (id, def) in found.dependencies {
            if resolved.contains_key(&id) {
                continue;
            }
            let dep_type = def.service_type();
            if dep_type == ServiceType::Cluster {
                return Err(ExchangeError::WrongDependentServiceType {
                    dependency: id,
                    service: found.id,
                    service_type: dep_type.to_string(),
                });
            }
            resolved.insert(id, def);
        }

        debug!(service = %service.identity(), dependency = %found.id, "required service validated");
        resolved.insert(found.id, found.definition);
    }

    Ok(resolved)
}
