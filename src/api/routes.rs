//! API handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use super::ApiState;
use crate::resource::{ResourceKey, ResourceType};
use crate::status::AGENT_VERSION;
use crate::sync::SyncStatus;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub version: String,
    pub resources: usize,
    pub sync: SyncStatus,
}

/// GET /api/status
pub async fn api_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let resources = state.store.read().await.len();
    let sync = state.sync_status.read().await.clone();

    Json(StatusResponse {
        node_id: state.node_id.clone(),
        version: AGENT_VERSION.to_string(),
        resources,
        sync,
    })
}

/// One ledger entry
#[derive(Serialize)]
pub struct ResourceSummary {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub name: String,
    pub version: String,
}

/// GET /api/resources
pub async fn api_resources(State(state): State<ApiState>) -> Json<Vec<ResourceSummary>> {
    let store = state.store.read().await;
    Json(
        store
            .entries()
            .into_iter()
            .map(|(key, entry)| ResourceSummary {
                kind: key.kind,
                name: key.name,
                version: entry.version,
            })
            .collect(),
    )
}

/// GET /api/resources/:kind/:name - the resource exactly as received
pub async fn api_resource(
    State(state): State<ApiState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let key = ResourceKey::new(ResourceType::from(kind), name);
    let resource = state.store.read().await.resource(&key);

    match resource {
        Some(resource) => (
            [(header::CONTENT_TYPE, "application/json")],
            resource.data().to_vec(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, format!("{} not found", key)).into_response(),
    }
}
