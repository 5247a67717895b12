//! Service Module
//!
//! Version expressions, service descriptors, dependency validation and the
//! cache-backed resolver that feeds it.

mod file;
mod resolver;
mod validate;
mod version;

pub use file::{ServiceFile, ServiceSpec};
pub use resolver::{CacheOnly, DependencyResolver, ServiceFetcher};
pub use validate::{validate_service, ResolvedDependencies, ResolvedService, ServiceDefResolver};
pub use version::{Version, VersionError, VersionRange, INFINITY};
