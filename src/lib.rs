//! Exchange Cache - local metadata cache for an edge agent
//!
//! Caches Exchange node and service metadata with read-time freshness,
//! invalidates it from Exchange change events, and validates service
//! dependency graphs against it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod service;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::ResourceCache;
pub use config::Config;
pub use error::{ExchangeError, Result};
pub use exchange::{invalidate, ChangeEvent};
pub use service::{validate_service, DependencyResolver};
pub use tasks::spawn_change_listener;
