//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint, including change
//! events flowing through the background listener.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use exchange_cache::{create_router, spawn_change_listener, AppState, Config, ResourceCache};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let (state, rx) = AppState::from_config(&Config::default());
    spawn_change_listener(state.cache.clone(), rx, None);
    create_router(state)
}

/// App whose change queue is drained by a running listener.
fn create_listening_app(excluded_id: Option<&str>) -> (Router, Arc<ResourceCache>) {
    let cache = Arc::new(ResourceCache::default());
    let (tx, rx) = mpsc::channel(16);
    spawn_change_listener(cache.clone(), rx, excluded_id.map(str::to_string));
    (create_router(AppState::new(cache.clone(), tx)), cache)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    // extractor rejections are plain text
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

/// Polls `uri` until it answers `expected`, giving the listener time to run.
async fn wait_for_status(app: &Router, uri: &str, expected: StatusCode) -> bool {
    for _ in 0..50 {
        let (status, _) = send(app, "GET", uri, None).await;
        if status == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn service_versions(url: &str, version: &str, cluster: bool, required: Value) -> Value {
    let (deployment, cluster_deployment) = if cluster {
        (json!(""), json!("operator.tar.gz"))
    } else {
        (json!({"services": {url: {}}}), json!(""))
    };
    json!({
        version: {
            "url": url,
            "version": version,
            "arch": "amd64",
            "requiredServices": required,
            "deployment": deployment,
            "clusterDeployment": cluster_deployment
        }
    })
}

// == Health & Stats ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let app = create_test_app();

    send(&app, "PUT", "/nodes/userdev/node1", Some(json!({"name": "node1"}))).await;
    send(&app, "GET", "/nodes/userdev/node1", None).await;
    send(&app, "GET", "/nodes/userdev/ghost", None).await;

    let (status, json) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["partitions"]["node_definition"]["hits"], 1);
    assert_eq!(json["partitions"]["node_definition"]["misses"], 1);
    assert_eq!(json["partitions"]["node_definition"]["total_entries"], 1);
    assert_eq!(json["total_entries"], 1);
}

// == Node Endpoints ==

#[tokio::test]
async fn test_node_definition_lifecycle() {
    let app = create_test_app();
    let node = json!({"name": "node1", "pattern": "A Pattern", "arch": "amd64", "nodeType": "device"});

    let (status, json) = send(&app, "PUT", "/nodes/userdev/node1", Some(node)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "userdev/node1");

    let (status, json) = send(&app, "GET", "/nodes/userdev/node1?max_age=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["pattern"], "A Pattern");
    assert_eq!(json["value"]["nodeType"], "device");

    let (status, json) = send(&app, "DELETE", "/nodes/userdev/node1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);

    let (status, json) = send(&app, "GET", "/nodes/userdev/node1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("userdev/node1"));

    // deleting again is a no-op
    let (status, json) = send(&app, "DELETE", "/nodes/userdev/node1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], false);
}

#[tokio::test]
async fn test_node_policy_is_separate_partition() {
    let app = create_test_app();
    let policy = json!({"properties": [{"name": "prop1", "value": 5}], "constraints": ["openhorizon.cpu > 2"]});

    send(&app, "PUT", "/nodes/userdev/node1/policy", Some(policy)).await;

    let (status, json) = send(&app, "GET", "/nodes/userdev/node1/policy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["properties"][0]["value"], 5);

    let (status, _) = send(&app, "GET", "/nodes/userdev/node1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_entry_respects_max_age() {
    let app = create_test_app();
    send(&app, "PUT", "/nodes/userdev/node1", Some(json!({"name": "node1"}))).await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let (status, _) = send(&app, "GET", "/nodes/userdev/node1?max_age=1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "GET", "/nodes/userdev/node1?max_age=60", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["age_seconds"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_put_node_with_encoded_slash_rejected() {
    let app = create_test_app();

    let (status, json) = send(&app, "PUT", "/nodes/user%2Fdev/node1", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("org"));
}

// == Service Endpoints ==

#[tokio::test]
async fn test_service_definitions_and_policies() {
    let app = create_test_app();
    let uri = "/services?org=IBM&url=gps&arch=amd64";

    let (status, _) = send(&app, "PUT", uri, Some(service_versions("gps", "1.0.0", false, json!([])))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "IBM/gps/amd64");
    assert_eq!(json["value"]["1.0.0"]["url"], "gps");

    let policy_uri = "/service-policies?org=IBM&url=gps&arch=amd64&version=1.0.0";
    let (status, _) = send(&app, "PUT", policy_uri, Some(json!({"constraints": ["a == b"]}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", policy_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["constraints"][0], "a == b");
}

#[tokio::test]
async fn test_services_with_full_exchange_url() {
    let app = create_test_app();
    let url = "https://bluehorizon.network/services/gps";
    let uri = "/services?org=IBM&url=https%3A%2F%2Fbluehorizon.network%2Fservices%2Fgps&arch=amd64";

    let (status, _) = send(&app, "PUT", uri, Some(service_versions(url, "1.0.0", false, json!([])))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "IBM/https://bluehorizon.network/services/gps/amd64");
    assert_eq!(json["value"]["1.0.0"]["url"], url);

    let policy_uri = format!("{}&version=1.0.0", uri.replacen("/services", "/service-policies", 1));
    let (status, _) = send(&app, "PUT", &policy_uri, Some(json!({"constraints": ["a == b"]}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = send(&app, "GET", &policy_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "IBM/https://bluehorizon.network/services/gps/amd64/1.0.0");

    let root = json!({
        "org": "e2edev",
        "url": "app",
        "version": "1.0.0",
        "arch": "amd64",
        "deployment": {"services": {"app": {}}},
        "requiredServices": [{"org": "IBM", "url": url, "versionRange": "1.0.0", "arch": "amd64"}]
    });
    let (status, json) = send(&app, "POST", "/services/validate", Some(root)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["dependencies"][0],
        "IBM/https://bluehorizon.network/services/gps_1.0.0_amd64"
    );
}

#[tokio::test]
async fn test_services_reject_slash_in_arch() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "PUT",
        "/services?org=IBM&url=gps&arch=amd%2F64",
        Some(service_versions("gps", "1.0.0", false, json!([]))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("arch"));
}

#[tokio::test]
async fn test_put_services_requires_versions() {
    let app = create_test_app();

    let (status, _) = send(&app, "PUT", "/services?org=IBM&url=gps&arch=amd64", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validate_service_against_cache() {
    let app = create_test_app();
    send(
        &app,
        "PUT",
        "/services?org=IBM&url=gps&arch=amd64",
        Some(service_versions(
            "gps",
            "1.2.0",
            false,
            json!([{"org": "IBM", "url": "operator", "versionRange": "", "arch": "amd64"}]),
        )),
    )
    .await;
    send(
        &app,
        "PUT",
        "/services?org=IBM&url=location&arch=amd64",
        Some(service_versions("location", "2.0.0", false, json!([]))),
    )
    .await;
    send(
        &app,
        "PUT",
        "/services?org=IBM&url=operator&arch=amd64",
        Some(service_versions("operator", "1.0.0", true, json!([]))),
    )
    .await;

    let root = |required: Value| {
        json!({
            "org": "e2edev",
            "url": "app",
            "version": "1.0.0",
            "arch": "amd64",
            "deployment": {"services": {"app": {}}},
            "requiredServices": required
        })
    };

    // location alone is fine
    let (status, json) = send(
        &app,
        "POST",
        "/services/validate",
        Some(root(json!([{"org": "IBM", "url": "location", "version": "2.0.0", "arch": "amd64"}]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["dependencies"][0], "IBM/location_2.0.0_amd64");

    // gps drags in a cluster-type operator
    let (status, json) = send(
        &app,
        "POST",
        "/services/validate",
        Some(root(json!([{"org": "IBM", "url": "gps", "versionRange": "[1.0.0,2.0.0)", "arch": "amd64"}]))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("IBM/operator_1.0.0_amd64"));

    // nothing cached for cpu
    let (status, _) = send(
        &app,
        "POST",
        "/services/validate",
        Some(root(json!([{"org": "IBM", "url": "cpu", "versionRange": "1.0.0", "arch": "amd64"}]))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_cluster_service_with_dependencies() {
    let app = create_test_app();
    let service = json!({
        "org": "e2edev",
        "url": "k8s-app",
        "version": "1.0.0",
        "arch": "amd64",
        "clusterDeployment": "operator.tar.gz",
        "requiredServices": [{"org": "IBM", "url": "gps", "versionRange": "1.0.0", "arch": "amd64"}]
    });

    let (status, json) = send(&app, "POST", "/services/validate", Some(service)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("requiredServices"));
}

// == Partition Endpoints ==

#[tokio::test]
async fn test_partition_keys_and_org_purge() {
    let app = create_test_app();
    for path in ["/nodes/orgA/n1", "/nodes/orgA/n2", "/nodes/orgAB/n3"] {
        send(&app, "PUT", path, Some(json!({}))).await;
    }

    let (status, json) = send(&app, "GET", "/partitions/node_definition/keys", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["keys"], json!(["orgA/n1", "orgA/n2", "orgAB/n3"]));

    let (status, json) = send(&app, "DELETE", "/partitions/nodes/orgs/orgA", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(json["resource_type"], "node_definition");

    let (_, json) = send(&app, "GET", "/partitions/node_definition/keys", None).await;
    assert_eq!(json["keys"], json!(["orgAB/n3"]));
}

#[tokio::test]
async fn test_unknown_partition_type() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/partitions/widgets/keys", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("widgets"));
}

// == Change Events ==

#[tokio::test]
async fn test_node_change_invalidates_through_listener() {
    let (app, cache) = create_listening_app(None);
    send(&app, "PUT", "/nodes/userdev/node1", Some(json!({}))).await;
    send(&app, "PUT", "/nodes/userdev/node1/policy", Some(json!({}))).await;
    send(&app, "PUT", "/nodes/userdev/node2", Some(json!({}))).await;

    let (status, _) = send(
        &app,
        "POST",
        "/changes",
        Some(json!({"orgId": "userdev", "id": "userdev/node1", "resource": "node", "operation": "modified"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    assert!(wait_for_status(&app, "/nodes/userdev/node1/policy", StatusCode::NOT_FOUND).await);
    assert!(cache.node_definition("userdev", "node1").is_none());
    assert!(cache.node_definition("userdev", "node2").is_some());
}

#[tokio::test]
async fn test_org_change_keeps_excluded_node() {
    let (app, cache) = create_listening_app(Some("userdev/self"));
    send(&app, "PUT", "/nodes/userdev/self", Some(json!({}))).await;
    send(&app, "PUT", "/nodes/userdev/other", Some(json!({}))).await;
    send(&app, "PUT", "/nodes/otherorg/n1", Some(json!({}))).await;

    let (status, _) = send(
        &app,
        "POST",
        "/changes",
        Some(json!({"orgId": "userdev", "id": "userdev", "resource": "org", "operation": "created"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    assert!(wait_for_status(&app, "/nodes/userdev/other", StatusCode::NOT_FOUND).await);
    assert!(cache.node_definition("userdev", "self").is_some());
    assert!(cache.node_definition("otherorg", "n1").is_some());
}

#[tokio::test]
async fn test_change_without_org_rejected() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/changes",
        Some(json!({"orgId": "", "id": "node1", "resource": "node"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
