//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_node_handler, delete_node_policy_handler, get_node_handler, get_node_policy_handler,
    get_service_policy_handler, get_services_handler, health_handler, keys_handler,
    post_change_handler, purge_org_handler, put_node_handler, put_node_policy_handler,
    put_service_policy_handler, put_services_handler, stats_handler, validate_service_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/nodes/:org/:id",
            put(put_node_handler)
                .get(get_node_handler)
                .delete(delete_node_handler),
        )
        .route(
            "/nodes/:org/:id/policy",
            put(put_node_policy_handler)
                .get(get_node_policy_handler)
                .delete(delete_node_policy_handler),
        )
        .route("/services", put(put_services_handler).get(get_services_handler))
        .route("/services/validate", post(validate_service_handler))
        .route(
            "/service-policies",
            put(put_service_policy_handler).get(get_service_policy_handler),
        )
        .route("/changes", post(post_change_handler))
        .route("/partitions/:resource_type/keys", get(keys_handler))
        .route("/partitions/:resource_type/orgs/:org", delete(purge_org_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
