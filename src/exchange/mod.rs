//! Exchange Module
//!
//! Registry payload types, change events, and the engine that turns change
//! events into cache invalidations.

mod change;
mod invalidation;
mod types;

pub use change::{exchange_url_form, ChangeEvent, ChangeOperation, ChangeResource, ServiceChangeId};
pub use invalidation::invalidate;
pub use types::{
    deployment_is_empty, service_identity, ExchangePolicy, NodeDefinition, NodePolicy, Property,
    ServiceDefinition, ServiceDependency, ServicePolicy, ServiceType, ServiceVersions, UserInput,
};
