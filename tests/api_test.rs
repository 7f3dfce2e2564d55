//! Local status API integration tests
//!
//! Serves the router on an ephemeral port and queries it over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use edge_sync::api::{create_router, ApiState};
use edge_sync::sync::SyncStatus;
use edge_sync::{Resource, SharedStore, Store};
use serde_json::{json, Value};
use tokio::sync::RwLock;

async fn serve(store: SharedStore, status: SyncStatus) -> SocketAddr {
    let app = create_router(ApiState {
        node_id: "edge-api".to_string(),
        store,
        sync_status: Arc::new(RwLock::new(status)),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn seeded_store() -> SharedStore {
    let store = Store::shared();
    {
        let mut guard = store.write().await;
        guard.put(
            Resource::decode(
                br#"{"type":"configuration","name":"conf","version":"3","value":{"data":{"k":"v"}}}"#,
            )
            .unwrap(),
        );
        guard.put(
            Resource::decode(
                br#"{"type":"application","name":"svc-a","version":"v1","value":{"name":"svc-a"}}"#,
            )
            .unwrap(),
        );
    }
    store
}

#[tokio::test]
async fn test_health() {
    let addr = serve(Store::shared(), SyncStatus::default()).await;

    let body = client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_status_reports_sync_state() {
    let status = SyncStatus {
        running: true,
        cycles: 4,
        failures: 1,
        last_error: Some("request timed out".to_string()),
        ..Default::default()
    };
    let addr = serve(seeded_store().await, status).await;

    let body: Value = client()
        .get(format!("http://{}/api/status", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["node_id"], "edge-api");
    assert_eq!(body["resources"], 2);
    assert_eq!(body["sync"]["running"], true);
    assert_eq!(body["sync"]["cycles"], 4);
    assert_eq!(body["sync"]["failures"], 1);
    assert_eq!(body["sync"]["last_error"], "request timed out");
}

#[tokio::test]
async fn test_resources_listing_is_sorted() {
    let addr = serve(seeded_store().await, SyncStatus::default()).await;

    let body: Value = client()
        .get(format!("http://{}/api/resources", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        json!([
            {"type": "application", "name": "svc-a", "version": "v1"},
            {"type": "configuration", "name": "conf", "version": "3"}
        ])
    );
}

#[tokio::test]
async fn test_resource_body_is_returned_verbatim() {
    let addr = serve(seeded_store().await, SyncStatus::default()).await;

    let response = client()
        .get(format!("http://{}/api/resources/configuration/conf", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"type":"configuration","name":"conf","version":"3","value":{"data":{"k":"v"}}}"#
    );
}

#[tokio::test]
async fn test_missing_resource_is_404() {
    let addr = serve(seeded_store().await, SyncStatus::default()).await;

    let response = client()
        .get(format!("http://{}/api/resources/application/ghost", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
