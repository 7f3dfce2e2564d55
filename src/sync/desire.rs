//! Desire exchange: fetch resource bodies and apply them to the ledger

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::protocol::{DesireRequest, DesireResponse};
use super::transport::SyncTransport;
use super::SyncError;
use crate::resource::{BaseResource, Resource, ResourceKey};
use crate::store::SharedStore;

/// What one desire response did to the ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    /// Every identity written to the ledger
    pub applied: Vec<ResourceKey>,
    /// Identities whose stored version changed
    pub changed: Vec<ResourceKey>,
    /// Entries that failed to decode
    pub rejected: usize,
    /// Stored entries of a type this agent does not act on
    pub unknown: usize,
}

pub struct DesireClient {
    transport: Arc<dyn SyncTransport>,
    store: SharedStore,
}

impl DesireClient {
    pub fn new(transport: Arc<dyn SyncTransport>, store: SharedStore) -> Self {
        Self { transport, store }
    }

    /// Fetch full bodies for `needs_fetch` and apply them.
    ///
    /// Each request entry carries the version the control plane wants, as
    /// returned by the ledger diff, not the version currently applied. An
    /// empty version asks for whatever body is current.
    ///
    /// A failed exchange leaves the ledger untouched.
    pub async fn desire(&self, needs_fetch: Vec<BaseResource>) -> Result<ApplyOutcome, SyncError> {
        let request = DesireRequest {
            resources: needs_fetch,
        };
        debug!(count = request.resources.len(), "Sending desire request");

        let response = self.transport.desire(&request).await?;
        Ok(self.apply(&response).await)
    }

    /// Decode every entry and write the good ones to the ledger.
    ///
    /// Malformed entries are skipped, never the whole batch. Entries of an
    /// unknown type are stored like any other. Applying the same
    /// response again leaves the ledger unchanged.
    pub async fn apply(&self, response: &DesireResponse) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        let mut decoded = Vec::with_capacity(response.resources.len());

        for raw in &response.resources {
            match Resource::decode(raw.get().as_bytes()) {
                Ok(resource) => {
                    if let Err(e) = resource.ensure_known() {
                        info!(name = resource.name(), error = %e, "Storing resource of unhandled type");
                        outcome.unknown += 1;
                    }
                    decoded.push(resource);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping malformed resource");
                    outcome.rejected += 1;
                }
            }
        }

        if decoded.is_empty() {
            return outcome;
        }

        let mut store = self.store.write().await;
        for resource in decoded {
            let key = resource.key();
            let version = resource.version().to_string();
            if store.put(resource) {
                info!(resource = %key, version = %version, "Applied resource");
                outcome.changed.push(key.clone());
            }
            outcome.applied.push(key);
        }

        outcome
    }
}
