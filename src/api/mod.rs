//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /nodes/:org/:id` - Node definitions
//! - `PUT|GET|DELETE /nodes/:org/:id/policy` - Node policies
//! - `PUT|GET /services?org=&url=&arch=` - Service version maps
//! - `PUT|GET /service-policies?org=&url=&arch=&version=` - Service policies
//! - `POST /services/validate` - Dependency validation against the cache
//! - `POST /changes` - Queue an Exchange change event
//! - `GET /partitions/:type/keys` - List a partition's keys
//! - `DELETE /partitions/:type/orgs/:org` - Purge an organization
//! - `GET /stats` - Per-partition statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
