//! Local status API
//!
//! Read-only view of the ledger and the sync loop for on-node tooling:
//! - Health check
//! - Agent and last-cycle status
//! - Applied resources, and the raw body of each

pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::SharedStore;
use crate::sync::SyncStatus;

/// State shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub node_id: String,
    pub store: SharedStore,
    pub sync_status: Arc<RwLock<SyncStatus>>,
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::api_status))
        .route("/api/resources", get(routes::api_resources))
        .route("/api/resources/:kind/:name", get(routes::api_resource))
        .with_state(state)
}
