//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::cache::keys::{node_key, service_key, service_policy_key};
use crate::cache::{CachedResource, ResourceCache, ResourceType};
use crate::config::Config;
use crate::error::{ExchangeError, Result};
use crate::exchange::{ChangeEvent, NodeDefinition, NodePolicy, ServicePolicy, ServiceVersions};
use crate::models::{
    validate_segment, CachedResponse, ChangeAccepted, DeleteResponse, HealthResponse,
    KeysResponse, MaxAgeQuery, PurgeResponse, ServicePolicyQuery, ServiceQuery, StatsResponse,
    StoredResponse, ValidationResponse,
};
use crate::service::{CacheOnly, DependencyResolver, ServiceFile};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared resource cache
    pub cache: Arc<ResourceCache>,
    /// Producer side of the change event queue
    pub changes: mpsc::Sender<ChangeEvent>,
}

impl AppState {
    pub fn new(cache: Arc<ResourceCache>, changes: mpsc::Sender<ChangeEvent>) -> Self {
        Self { cache, changes }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Returns the receiving end of the change queue, to be handed to
    /// [`spawn_change_listener`](crate::tasks::spawn_change_listener).
    pub fn from_config(config: &Config) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let cache = Arc::new(ResourceCache::new(config.cache_max_age));
        let (tx, rx) = mpsc::channel(config.change_queue_capacity.max(1));
        (Self::new(cache, tx), rx)
    }

    /// Resolver that only sees what is already cached.
    pub fn resolver(&self) -> DependencyResolver<CacheOnly> {
        DependencyResolver::new(Arc::clone(&self.cache), CacheOnly)
    }
}

fn check_segments(segments: &[(&str, &str)]) -> Result<()> {
    match segments
        .iter()
        .find_map(|(name, value)| validate_segment(name, value))
    {
        Some(msg) => Err(ExchangeError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Reads `key` from `V`'s partition with the caller's bound or the default.
fn read_cached<V>(state: &AppState, key: String, max_age: Option<u64>) -> Result<Json<CachedResponse<V>>>
where
    V: CachedResource + Serialize,
{
    let max_age = max_age.unwrap_or_else(|| state.cache.default_max_age());
    let value = state
        .cache
        .read::<V>(&key, max_age)
        .ok_or_else(|| ExchangeError::NotCached(key.clone()))?;
    let age_seconds = state
        .cache
        .entry_age(V::RESOURCE_TYPE, &key)
        .unwrap_or_default();

    Ok(Json(CachedResponse {
        key,
        age_seconds,
        value,
    }))
}

fn store<V: CachedResource>(state: &AppState, key: String, value: V) -> Json<StoredResponse> {
    state.cache.update(key.clone(), value);
    Json(StoredResponse::new(V::RESOURCE_TYPE, key))
}

fn remove(state: &AppState, resource_type: ResourceType, key: String) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(resource_type, &key);
    Json(DeleteResponse { key, deleted })
}

// == Nodes ==

/// Handler for PUT /nodes/:org/:id
pub async fn put_node_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Json(node): Json<NodeDefinition>,
) -> Result<Json<StoredResponse>> {
    check_segments(&[("org", org.as_str()), ("id", id.as_str())])?;
    Ok(store(&state, node_key(&org, &id), node))
}

/// Handler for GET /nodes/:org/:id
pub async fn get_node_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Query(query): Query<MaxAgeQuery>,
) -> Result<Json<CachedResponse<NodeDefinition>>> {
    read_cached(&state, node_key(&org, &id), query.max_age)
}

/// Handler for DELETE /nodes/:org/:id
pub async fn delete_node_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
) -> Json<DeleteResponse> {
    remove(&state, ResourceType::NodeDefinition, node_key(&org, &id))
}

/// Handler for PUT /nodes/:org/:id/policy
pub async fn put_node_policy_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Json(policy): Json<NodePolicy>,
) -> Result<Json<StoredResponse>> {
    check_segments(&[("org", org.as_str()), ("id", id.as_str())])?;
    Ok(store(&state, node_key(&org, &id), policy))
}

/// Handler for GET /nodes/:org/:id/policy
pub async fn get_node_policy_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
    Query(query): Query<MaxAgeQuery>,
) -> Result<Json<CachedResponse<NodePolicy>>> {
    read_cached(&state, node_key(&org, &id), query.max_age)
}

/// Handler for DELETE /nodes/:org/:id/policy
pub async fn delete_node_policy_handler(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, String)>,
) -> Json<DeleteResponse> {
    remove(&state, ResourceType::NodePolicy, node_key(&org, &id))
}

// == Services ==

/// Handler for PUT /services?org=&url=&arch=
///
/// The body maps version strings to service definitions and replaces
/// whatever was cached for `org/url/arch`.
pub async fn put_services_handler(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
    Json(versions): Json<ServiceVersions>,
) -> Result<Json<StoredResponse>> {
    if let Some(msg) = query.validate() {
        return Err(ExchangeError::InvalidRequest(msg));
    }
    if versions.is_empty() {
        return Err(ExchangeError::InvalidRequest(
            "at least one service version is required".to_string(),
        ));
    }
    Ok(store(
        &state,
        service_key(&query.org, &query.url, &query.arch),
        versions,
    ))
}

/// Handler for GET /services?org=&url=&arch=
pub async fn get_services_handler(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<CachedResponse<ServiceVersions>>> {
    read_cached(
        &state,
        service_key(&query.org, &query.url, &query.arch),
        query.max_age,
    )
}

/// Handler for PUT /service-policies?org=&url=&arch=&version=
pub async fn put_service_policy_handler(
    State(state): State<AppState>,
    Query(query): Query<ServicePolicyQuery>,
    Json(policy): Json<ServicePolicy>,
) -> Result<Json<StoredResponse>> {
    if let Some(msg) = query.validate() {
        return Err(ExchangeError::InvalidRequest(msg));
    }
    let key = service_policy_key(&query.org, &query.url, &query.arch, &query.version);
    Ok(store(&state, key, policy))
}

/// Handler for GET /service-policies?org=&url=&arch=&version=
pub async fn get_service_policy_handler(
    State(state): State<AppState>,
    Query(query): Query<ServicePolicyQuery>,
) -> Result<Json<CachedResponse<ServicePolicy>>> {
    let key = service_policy_key(&query.org, &query.url, &query.arch, &query.version);
    read_cached(&state, key, query.max_age)
}

/// Handler for POST /services/validate
///
/// Validates the dependency graph of a service file against cached
/// service definitions only.
pub async fn validate_service_handler(
    State(state): State<AppState>,
    Json(mut file): Json<ServiceFile>,
) -> Result<Json<ValidationResponse>> {
    file.support_version_range();
    let dependencies = state.resolver().validate(&file)?;

    Ok(Json(ValidationResponse {
        valid: true,
        dependencies: dependencies.into_keys().collect(),
    }))
}

// == Changes ==

/// Handler for POST /changes
///
/// Queues the event for the change listener; invalidation happens
/// asynchronously.
pub async fn post_change_handler(
    State(state): State<AppState>,
    Json(event): Json<ChangeEvent>,
) -> Result<(StatusCode, Json<ChangeAccepted>)> {
    check_segments(&[("orgId", event.org_id.as_str())])?;
    if event.id.is_empty() {
        return Err(ExchangeError::InvalidRequest("id cannot be empty".to_string()));
    }

    let accepted = ChangeAccepted::new(&event.org_id, &event.id);
    state
        .changes
        .send(event)
        .await
        .map_err(|_| ExchangeError::QueueClosed)?;

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

// == Partitions ==

/// Handler for GET /partitions/:type/keys
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Result<Json<KeysResponse>> {
    let resource_type: ResourceType = resource_type.parse()?;
    let mut keys = state.cache.keys(resource_type);
    keys.sort();

    Ok(Json(KeysResponse {
        resource_type,
        keys,
    }))
}

/// Handler for DELETE /partitions/:type/orgs/:org
pub async fn purge_org_handler(
    State(state): State<AppState>,
    Path((resource_type, org)): Path<(String, String)>,
) -> Result<Json<PurgeResponse>> {
    let resource_type: ResourceType = resource_type.parse()?;
    check_segments(&[("org", org.as_str())])?;

    let removed = state.cache.delete_by_organization(resource_type, &org);
    info!(partition = %resource_type, org = %org, removed, "organization purged on request");

    Ok(Json(PurgeResponse {
        resource_type,
        org,
        removed,
    }))
}

/// Handler for GET /stats
///
/// Returns per-partition statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        ResourceType::ALL
            .iter()
            .map(|rt| (*rt, state.cache.stats(*rt))),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
