//! Cache-backed dependency resolver
//!
//! Reads service version maps through the [`ResourceCache`], falls back to a
//! [`ServiceFetcher`] on a miss and writes the result through. Resolution
//! picks the highest version inside the requested range and then walks that
//! version's required services.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::keys::service_key;
use crate::cache::ResourceCache;
use crate::error::{ExchangeError, Result};
use crate::exchange::{service_identity, ServiceDefinition, ServiceVersions};
use crate::service::{
    validate_service, ResolvedDependencies, ResolvedService, ServiceDefResolver, ServiceSpec,
    Version, VersionRange,
};

// == Service Fetcher ==
/// Source of service version maps when the cache has nothing fresh.
pub trait ServiceFetcher {
    /// Every published version of `org/url/arch`, keyed by version string.
    fn fetch_service_versions(&self, org: &str, url: &str, arch: &str) -> Result<ServiceVersions>;
}

impl<F> ServiceFetcher for F
where
    F: Fn(&str, &str, &str) -> Result<ServiceVersions>,
{
    fn fetch_service_versions(&self, org: &str, url: &str, arch: &str) -> Result<ServiceVersions> {
        self(org, url, arch)
    }
}

/// Fetcher for deployments without a registry connection: every miss is
/// reported as not found.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOnly;

impl ServiceFetcher for CacheOnly {
    fn fetch_service_versions(&self, org: &str, url: &str, arch: &str) -> Result<ServiceVersions> {
        Err(ExchangeError::ServiceNotFound(service_key(org, url, arch)))
    }
}

// == Walk ==
type LookupKey = (String, String, String, String);

/// State carried through one resolution call.
#[derive(Debug, Default)]
struct Walk {
    /// Completed subtrees keyed by service identity
    resolved: HashMap<String, ResolvedService>,
    /// `(org, url, range, arch)` to the identity it resolved to
    lookups: HashMap<LookupKey, String>,
    in_progress: HashSet<String>,
}

// == Dependency Resolver ==
#[derive(Debug)]
pub struct DependencyResolver<F> {
    cache: Arc<ResourceCache>,
    fetcher: F,
    max_age: u64,
}

impl<F: ServiceFetcher> DependencyResolver<F> {
    /// Uses the cache's default freshness bound.
    pub fn new(cache: Arc<ResourceCache>, fetcher: F) -> Self {
        let max_age = cache.default_max_age();
        Self {
            cache,
            fetcher,
            max_age,
        }
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    // == Read Through ==
    /// Cached versions of `org/url/arch`, fetched and stored on a miss.
    ///
    /// An empty fetch result is reported as not found and is not cached.
    pub fn service_versions(&self, org: &str, url: &str, arch: &str) -> Result<Arc<ServiceVersions>> {
        let key = service_key(org, url, arch);
        if let Some(versions) = self.cache.read::<ServiceVersions>(&key, self.max_age) {
            return Ok(versions);
        }

        let fetched = self.fetcher.fetch_service_versions(org, url, arch)?;
        if fetched.is_empty() {
            return Err(ExchangeError::ServiceNotFound(key));
        }

        info!(service = %key, versions = fetched.len(), "service definitions fetched");
        let shared = Arc::new(fetched);
        self.cache.update_shared(key, Arc::clone(&shared));
        Ok(shared)
    }

    /// Highest version of `org/url/arch` inside `range`.
    ///
    /// Versions whose string does not parse are skipped.
    pub fn select_version(
        &self,
        org: &str,
        url: &str,
        range: &VersionRange,
        arch: &str,
    ) -> Result<ServiceDefinition> {
        let versions = self.service_versions(org, url, arch)?;
        versions
            .values()
            .filter_map(|def| {
                def.version
                    .parse::<Version>()
                    .ok()
                    .filter(|v| range.contains(v))
                    .map(|v| (v, def))
            })
            .max_by_key(|(v, _)| *v)
            .map(|(_, def)| def.clone())
            .ok_or_else(|| ExchangeError::NoMatchingVersion {
                service: service_key(org, url, arch),
                range: range.to_string(),
            })
    }

    /// Validates `service` against definitions reachable through this
    /// resolver.
    ///
    /// One walk spans the whole call, so a subtree shared by sibling
    /// dependencies is resolved once.
    pub fn validate<S: ServiceSpec + ?Sized>(&self, service: &S) -> Result<ResolvedDependencies> {
        let session = Session {
            resolver: self,
            walk: RefCell::new(Walk::default()),
        };
        validate_service(&session, service)
    }

    fn resolve_range(
        &self,
        walk: &mut Walk,
        url: &str,
        org: &str,
        version_range: &str,
        arch: &str,
    ) -> Result<ResolvedService> {
        let range = VersionRange::parse(version_range).map_err(|source| {
            ExchangeError::VersionConstraint {
                constraint: version_range.to_string(),
                service: format!("{}/{}", org, url),
                source,
            }
        })?;
        self.resolve_in(walk, url, org, &range, arch)
    }

    fn resolve_in(
        &self,
        walk: &mut Walk,
        url: &str,
        org: &str,
        range: &VersionRange,
        arch: &str,
    ) -> Result<ResolvedService> {
        let lookup = (
            org.to_string(),
            url.to_string(),
            range.to_string(),
            arch.to_string(),
        );
        if let Some(done) = walk.lookups.get(&lookup).and_then(|id| walk.resolved.get(id)) {
            return Ok(done.clone());
        }

        let definition = self.select_version(org, url, range, arch)?;
        let id = service_identity(org, url, &definition.version, arch);
        if let Some(done) = walk.resolved.get(&id) {
            let done = done.clone();
            walk.lookups.insert(lookup, id);
            return Ok(done);
        }
        if !walk.in_progress.insert(id.clone()) {
            return Err(ExchangeError::DependencyCycle(id));
        }

        let mut dependencies = ResolvedDependencies::new();
        for dep in &definition.required_services {
            let constraint = dep.version_range();
            let dep_range = VersionRange::parse(constraint).map_err(|source| {
                ExchangeError::VersionConstraint {
                    constraint: constraint.to_string(),
                    service: dep.to_string(),
                    source,
                }
            })?;
            let child = self.resolve_in(walk, &dep.url, &dep.org, &dep_range, &dep.arch)?;
            dependencies.extend(child.dependencies);
            dependencies.insert(child.id, child.definition);
        }

        walk.in_progress.remove(&id);
        debug!(service = %id, dependencies = dependencies.len(), "service resolved");

        let resolved = ResolvedService {
            dependencies,
            definition,
            id: id.clone(),
        };
        walk.resolved.insert(id.clone(), resolved.clone());
        walk.lookups.insert(lookup, id);
        Ok(resolved)
    }
}

impl<F: ServiceFetcher> ServiceDefResolver for DependencyResolver<F> {
    fn resolve(
        &self,
        url: &str,
        org: &str,
        version_range: &str,
        arch: &str,
    ) -> Result<ResolvedService> {
        self.resolve_range(&mut Walk::default(), url, org, version_range, arch)
    }
}

/// Resolver view sharing one [`Walk`] across every lookup of a validation.
struct Session<'a, F> {
    resolver: &'a DependencyResolver<F>,
    walk: RefCell<Walk>,
}

impl<F: ServiceFetcher> ServiceDefResolver for Session<'_, F> {
    fn resolve(
        &self,
        url: &str,
        org: &str,
        version_range: &str,
        arch: &str,
    ) -> Result<ResolvedService> {
        let mut walk = self.walk.borrow_mut();
        self.resolver
            .resolve_range(&mut walk, url, org, version_range, arch)
    }
}
