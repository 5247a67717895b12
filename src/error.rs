//! Error types for the Exchange metadata cache
//!
//! Provides unified error handling using thiserror. Cache misses are not
//! errors; they surface as `None` from the cache layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::service::VersionError;

// == Exchange Error Enum ==
/// Unified error type for the cache, the invalidation surface and the
/// service dependency resolver.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No fresh cache entry under the key
    #[error("Not cached: {0}")]
    NotCached(String),

    /// Resource type tag not recognized
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// A required service's version constraint could not be parsed
    #[error("Failed to convert version {constraint} for service {service} to version range expression: {source}")]
    VersionConstraint {
        constraint: String,
        service: String,
        #[source]
        source: VersionError,
    },

    /// A cluster-type service declared required services
    #[error("'requiredServices' is not supported for cluster type service {0}")]
    ClusterRequiredServices(String),

    /// A required service resolved to a cluster-type service
    #[error("The required service {service} has the wrong service type: {service_type}")]
    WrongServiceType {
        service: String,
        service_type: String,
    },

    /// A transitive dependency of a required service is a cluster-type service
    #[error("The dependent service {dependency} for the required service {service} has the wrong service type: {service_type}")]
    WrongDependentServiceType {
        dependency: String,
        service: String,
        service_type: String,
    },

    /// A user input without a default value was not supplied
    #[error("user input {0} has no default value and is not set")]
    UnsetUserInput(String),

    /// The lookup callback failed for a required service
    #[error("Error retrieving service from the Exchange for {service}: {source}")]
    Lookup {
        service: String,
        #[source]
        source: Box<ExchangeError>,
    },

    /// No service definition exists for org/url/arch
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Service definitions exist but none satisfies the version range
    #[error("No version of {service} satisfies {range}")]
    NoMatchingVersion { service: String, range: String },

    /// The required-services graph loops back on itself
    #[error("Dependency cycle detected at {0}")]
    DependencyCycle(String),

    /// The registry collaborator failed
    #[error("Exchange error: {0}")]
    Registry(String),

    /// The change event queue is no longer accepting events
    #[error("Change queue closed")]
    QueueClosed,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    /// Returns true for type-consistency and version-constraint failures.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ExchangeError::VersionConstraint { .. }
                | ExchangeError::ClusterRequiredServices(_)
                | ExchangeError::WrongServiceType { .. }
                | ExchangeError::WrongDependentServiceType { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExchangeError::InvalidRequest(_) | ExchangeError::UnsetUserInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ExchangeError::NotCached(_) | ExchangeError::UnknownResourceType(_) => {
                StatusCode::NOT_FOUND
            }
            ExchangeError::VersionConstraint { .. }
            | ExchangeError::ClusterRequiredServices(_)
            | ExchangeError::WrongServiceType { .. }
            | ExchangeError::WrongDependentServiceType { .. }
            | ExchangeError::DependencyCycle(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ExchangeError::Lookup { source, .. } => match source.as_ref() {
                ExchangeError::ServiceNotFound(_) | ExchangeError::NoMatchingVersion { .. } => {
                    StatusCode::NOT_FOUND
                }
                ExchangeError::Registry(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ExchangeError::ServiceNotFound(_) | ExchangeError::NoMatchingVersion { .. } => {
                StatusCode::NOT_FOUND
            }
            ExchangeError::Registry(_) => StatusCode::BAD_GATEWAY,
            ExchangeError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            ExchangeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, ExchangeError>;
