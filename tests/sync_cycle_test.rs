//! End-to-end sync cycle tests against a fake control plane
//!
//! Covers:
//! - Report → desire → apply over real HTTP
//! - Skipping the desire exchange when the ledger is current
//! - Partial batches with malformed entries
//! - Mapping of HTTP failures onto the error taxonomy

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use edge_sync::config::RemoteConfig;
use edge_sync::status::NodeInspector;
use edge_sync::sync::{
    ChangeSet, HttpTransport, ProtocolError, SyncCoordinator, SyncError, TransportError,
};
use edge_sync::{Resource, ResourceKey, ResourceType, SharedStore, Store};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT: &str = "/v1/sync/report";
const DESIRE: &str = "/v1/sync/desire";

struct Harness {
    coordinator: SyncCoordinator,
    store: SharedStore,
    changes: mpsc::Receiver<ChangeSet>,
}

fn harness(address: &str, timeout_secs: u64) -> Harness {
    let remote = RemoteConfig {
        address: address.to_string(),
        timeout_secs,
        ..Default::default()
    };
    let transport = Arc::new(HttpTransport::new(&remote).unwrap());
    let store = Store::shared();
    let inspector = Arc::new(NodeInspector::new(
        "edge-test".to_string(),
        BTreeMap::new(),
        store.clone(),
    ));
    let (tx, rx) = mpsc::channel(8);

    Harness {
        coordinator: SyncCoordinator::new(
            transport,
            store.clone(),
            inspector,
            tx,
            Duration::from_secs(60),
            Duration::from_secs(1),
        ),
        store,
        changes: rx,
    }
}

fn app(name: &str, version: &str) -> serde_json::Value {
    json!({
        "type": "application",
        "name": name,
        "version": version,
        "value": {"name": name, "services": [{"name": "main", "image": format!("{name}:{version}")}]}
    })
}

// =============================================================================
// Happy paths
// =============================================================================

#[tokio::test]
async fn test_report_desire_apply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .and(body_partial_json(json!({"metadata": {"node": "edge-test"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"delta": {"apps": {"svc-a": ""}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .and(body_json(json!({"resources": [{"type": "application", "name": "svc-a"}]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"resources": [app("svc-a", "v1")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), 5);
    let outcome = h.coordinator.run_once().await.unwrap();

    assert_eq!(outcome.requested, 1);
    let store = h.store.read().await;
    assert_eq!(store.get(&ResourceType::Application, "svc-a"), Some("v1"));

    let key = ResourceKey::new(ResourceType::Application, "svc-a");
    let stored = store.resource(&key).unwrap();
    assert_eq!(
        stored.as_application().unwrap().services[0].image,
        "svc-a:v1"
    );

    let changes = h.changes.try_recv().unwrap();
    assert_eq!(changes.keys, vec![key]);
}

#[tokio::test]
async fn test_empty_delta_makes_no_desire_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": []})))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), 5);
    let outcome = h.coordinator.run_once().await.unwrap();

    assert_eq!(outcome.requested, 0);
    assert!(h.store.read().await.is_empty());
}

#[tokio::test]
async fn test_current_ledger_makes_no_desire_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .and(body_partial_json(json!({"apps": {"svc-a": "v1"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"delta": {"apps": {"svc-a": "v1"}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), 5);
    let raw = serde_json::to_vec(&app("svc-a", "v1")).unwrap();
    h.store.write().await.put(Resource::decode(&raw).unwrap());

    let outcome = h.coordinator.run_once().await.unwrap();
    assert_eq!(outcome.desired, 1);
    assert_eq!(outcome.requested, 0);
}

#[tokio::test]
async fn test_malformed_entry_does_not_fail_cycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "delta": {
                "apps": {"svc-a": "v1", "svc-b": "v1"},
                "configs": {"conf": "2"}
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            app("svc-a", "v1"),
            {"type": "application", "name": "svc-b", "version": "v1", "value": {"services": "oops"}},
            {"type": "configuration", "name": "conf", "version": "2", "value": {"data": {"k": "v"}}}
        ]})))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), 5);
    let outcome = h.coordinator.run_once().await.unwrap();

    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.applied.applied.len(), 2);
    assert_eq!(outcome.applied.rejected, 1);

    let store = h.store.read().await;
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&ResourceType::Application, "svc-b"), None);
    assert_eq!(store.get(&ResourceType::Configuration, "conf"), Some("2"));
}

#[tokio::test]
async fn test_replayed_cycle_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"delta": {"apps": {"svc-a": null}}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"resources": [app("svc-a", "v1")]})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), 5);
    h.coordinator.run_once().await.unwrap();
    let second = h.coordinator.run_once().await.unwrap();

    assert!(second.applied.changed.is_empty());
    assert_eq!(h.store.read().await.len(), 1);
    assert!(h.changes.try_recv().is_ok());
    assert!(h.changes.try_recv().is_err());
}

// =============================================================================
// Failure mapping
// =============================================================================

async fn report_failure(response: ResponseTemplate, timeout_secs: u64) -> SyncError {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .respond_with(response)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), timeout_secs);
    let err = h.coordinator.run_once().await.unwrap_err();
    assert!(h.store.read().await.is_empty());
    err
}

#[tokio::test]
async fn test_unauthorized() {
    let err = report_failure(ResponseTemplate::new(401), 5).await;
    assert_eq!(
        err,
        SyncError::Protocol(ProtocolError::Unauthorized { status: 401 })
    );

    let err = report_failure(ResponseTemplate::new(403), 5).await;
    assert_eq!(
        err,
        SyncError::Protocol(ProtocolError::Unauthorized { status: 403 })
    );
}

#[tokio::test]
async fn test_server_error() {
    let err = report_failure(ResponseTemplate::new(502), 5).await;
    assert_eq!(
        err,
        SyncError::Protocol(ProtocolError::ServerError { status: 502 })
    );
}

#[tokio::test]
async fn test_malformed_response() {
    let err = report_failure(
        ResponseTemplate::new(200).set_body_string("<html>gateway</html>"),
        5,
    )
    .await;
    assert!(matches!(
        err,
        SyncError::Protocol(ProtocolError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_timeout() {
    let err = report_failure(
        ResponseTemplate::new(200)
            .set_body_json(json!({}))
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    assert_eq!(err, SyncError::Transport(TransportError::Timeout));
}

#[tokio::test]
async fn test_connection_refused() {
    let h = harness("http://127.0.0.1:1", 5);
    let err = h.coordinator.run_once().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Transport(TransportError::ConnectionRefused(_))
    ));
}

#[tokio::test]
async fn test_desire_failure_leaves_store_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REPORT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"delta": {"apps": {"svc-a": "v1"}}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DESIRE))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut h = harness(&server.uri(), 5);
    let err = h.coordinator.run_once().await.unwrap_err();

    assert_eq!(
        err,
        SyncError::Protocol(ProtocolError::ServerError { status: 503 })
    );
    assert!(h.store.read().await.is_empty());
    assert!(h.changes.try_recv().is_err());
}
