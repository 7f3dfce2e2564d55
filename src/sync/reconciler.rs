//! Turns a reported delta into ledger updates

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::desire::{ApplyOutcome, DesireClient};
use super::protocol::BackwardInfo;
use super::SyncError;
use crate::resource::{BaseResource, ResourceKey, ResourceType};
use crate::store::{SharedStore, Store};

/// Identities whose applied version changed in one pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub keys: Vec<ResourceKey>,
}

/// Result of one reconcile pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Entries named by the delta
    pub desired: usize,
    /// Entries sent in the desire request (0 = no exchange)
    pub requested: usize,
    pub applied: ApplyOutcome,
    /// Configurations referenced by changed applications but not applied
    /// at the referenced version
    pub unresolved: Vec<BaseResource>,
}

pub struct Reconciler {
    store: SharedStore,
    desire: DesireClient,
    changes: mpsc::Sender<ChangeSet>,
}

impl Reconciler {
    pub fn new(store: SharedStore, desire: DesireClient, changes: mpsc::Sender<ChangeSet>) -> Self {
        Self {
            store,
            desire,
            changes,
        }
    }

    /// Converge the ledger towards the delta of the latest report.
    ///
    /// Resources the delta does not mention are left alone.
    pub async fn reconcile(&self, info: &BackwardInfo) -> Result<ReconcileOutcome, SyncError> {
        if !info.metadata.is_empty() {
            debug!(keys = ?info.metadata.keys().collect::<Vec<_>>(), "Control plane metadata");
        }

        let desired = desires_from_delta(&info.delta);
        let needs_fetch = self.store.read().await.diff(&desired);

        let mut outcome = ReconcileOutcome {
            desired: desired.len(),
            requested: needs_fetch.len(),
            ..Default::default()
        };

        if needs_fetch.is_empty() {
            debug!(desired = outcome.desired, "Ledger up to date");
            return Ok(outcome);
        }

        info!(
            desired = outcome.desired,
            fetching = outcome.requested,
            "Fetching desired resources"
        );
        outcome.applied = self.desire.desire(needs_fetch).await?;

        if !outcome.applied.changed.is_empty() {
            outcome.unresolved = unresolved_config_refs(
                &*self.store.read().await,
                &outcome.applied.changed,
            );
            for missing in &outcome.unresolved {
                warn!(
                    configuration = %missing.name,
                    version = %missing.version,
                    "Application references a configuration that is not applied"
                );
            }

            self.notify(ChangeSet {
                keys: outcome.applied.changed.clone(),
            });
        }

        Ok(outcome)
    }

    /// Hand a change set to the workload layer without waiting on it
    fn notify(&self, change_set: ChangeSet) {
        match self.changes.try_send(change_set) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    count = dropped.keys.len(),
                    "Change receiver is not keeping up, dropping change set"
                );
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Change receiver closed, dropping change set");
            }
        }
    }
}

/// Configuration references of the changed applications that the ledger
/// cannot satisfy. A reference without a version is satisfied by any.
fn unresolved_config_refs(store: &Store, changed: &[ResourceKey]) -> Vec<BaseResource> {
    let mut unresolved = Vec::new();

    for key in changed.iter().filter(|k| k.kind == ResourceType::Application) {
        let Some(resource) = store.resource(key) else {
            continue;
        };
        let Some(app) = resource.as_application() else {
            continue;
        };

        for reference in app.config_refs() {
            let applied = store.get(&ResourceType::Configuration, &reference.name);
            let satisfied = match applied {
                Some(version) => reference.version.is_empty() || version == reference.version,
                None => false,
            };
            let wanted = BaseResource::new(
                ResourceType::Configuration,
                reference.name.clone(),
                reference.version.clone(),
            );
            if !satisfied && !unresolved.contains(&wanted) {
                unresolved.push(wanted);
            }
        }
    }

    unresolved
}

/// Map a delta key onto the resource kind it lists
fn delta_kind(key: &str) -> Option<ResourceType> {
    match key {
        "application" | "applications" | "apps" => Some(ResourceType::Application),
        "configuration" | "configurations" | "configs" => Some(ResourceType::Configuration),
        _ => None,
    }
}

/// Translate delta entries into desired (type, name, version) entries.
///
/// Each recognised key holds an object of name -> version. A null version
/// means "whatever is current"; other scalars use their text form.
pub fn desires_from_delta(delta: &BTreeMap<String, Value>) -> Vec<BaseResource> {
    let mut desired = Vec::new();

    for (key, entries) in delta {
        let Some(kind) = delta_kind(key) else {
            debug!(key = %key, "Ignoring unrecognised delta key");
            continue;
        };
        let Some(entries) = entries.as_object() else {
            warn!(key = %key, "Delta entry is not an object, skipping");
            continue;
        };

        for (name, version) in entries {
            let version = match version {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    warn!(key = %key, name = %name, version = %other, "Unusable version in delta, skipping");
                    continue;
                }
            };
            desired.push(BaseResource::new(kind.clone(), name.clone(), version));
        }
    }

    desired
}
