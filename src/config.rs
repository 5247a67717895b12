//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::DEFAULT_MAX_AGE;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Freshness bound in seconds for reads that do not pass their own
    pub cache_max_age: u64,
    /// Composite key (`org/nodeId`) of the local node, exempt from invalidation
    pub agent_node_id: Option<String>,
    /// Capacity of the change event queue
    pub change_queue_capacity: usize,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8510)
    /// - `CACHE_MAX_AGE` - Default freshness bound in seconds (default: 60)
    /// - `AGENT_NODE_ID` - `org/nodeId` exempt from invalidation (default: unset)
    /// - `CHANGE_QUEUE_CAPACITY` - Change event queue size (default: 256)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_max_age: env_or("CACHE_MAX_AGE", defaults.cache_max_age),
            agent_node_id: env::var("AGENT_NODE_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            // a zero-capacity channel cannot be built
            change_queue_capacity: env_or("CHANGE_QUEUE_CAPACITY", defaults.change_queue_capacity)
                .max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8510,
            cache_max_age: DEFAULT_MAX_AGE,
            agent_node_id: None,
            change_queue_capacity: 256,
        }
    }
}
