//! Version ledger of applied resources
//!
//! Maps (type, name) to the last successfully applied version plus the
//! decoded resource. Lives for the process lifetime; entries are only ever
//! created or overwritten.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::resource::{BaseResource, Resource, ResourceKey, ResourceType};

/// Store shared between the sync loop (writer) and status readers
pub type SharedStore = Arc<RwLock<Store>>;

/// A ledger entry
#[derive(Debug, Clone)]
pub struct StoredResource {
    pub version: String,
    pub resource: Arc<Resource>,
}

#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<ResourceKey, StoredResource>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Applied version for an identity, if any
    pub fn get(&self, kind: &ResourceType, name: &str) -> Option<&str> {
        self.entries
            .get(&ResourceKey::new(kind.clone(), name))
            .map(|e| e.version.as_str())
    }

    pub fn resource(&self, key: &ResourceKey) -> Option<Arc<Resource>> {
        self.entries.get(key).map(|e| e.resource.clone())
    }

    /// Record a resource as applied, replacing any prior entry.
    ///
    /// Returns true when the stored version changed (new identity or a
    /// different version string).
    pub fn put(&mut self, resource: Resource) -> bool {
        let key = resource.key();
        let entry = StoredResource {
            version: resource.version().to_string(),
            resource: Arc::new(resource),
        };
        let previous = self.entries.insert(key, entry.clone());
        previous.map_or(true, |prev| prev.version != entry.version)
    }

    /// Entries of `desired` that need fetching, in input order.
    ///
    /// An entry needs fetching when the ledger has no version for it, holds
    /// a different version, or the desired version is empty.
    pub fn diff(&self, desired: &[BaseResource]) -> Vec<BaseResource> {
        desired
            .iter()
            .filter(|want| {
                want.version.is_empty()
                    || self.get(&want.kind, &want.name) != Some(want.version.as_str())
            })
            .cloned()
            .collect()
    }

    /// Ledger entries sorted by identity
    pub fn entries(&self) -> Vec<(ResourceKey, StoredResource)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Applied application versions, as reported upstream
    pub fn app_versions(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, _)| k.kind == ResourceType::Application)
            .map(|(k, v)| (k.name.clone(), v.version.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
