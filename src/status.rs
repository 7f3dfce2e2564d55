//! Node status inspection
//!
//! Builds the [`ForwardInfo`] snapshot pushed on every report: host facts
//! from sysinfo, applied application versions from the ledger, and static
//! metadata from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use sysinfo::System;

use crate::store::SharedStore;
use crate::sync::protocol::ForwardInfo;

/// Agent version reported upstream
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata key carrying the node id
pub const NODE_ID_KEY: &str = "node";

/// Host status snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub hostname: String,
    pub os: String,
    pub kernel_version: String,
    pub arch: String,
    pub cpu_cores: usize,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub uptime_secs: u64,
    pub agent_version: String,
    /// Unix seconds when the snapshot was taken
    pub timestamp: u64,
}

/// Produces the snapshot sent on each report
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn forward_info(&self) -> ForwardInfo;
}

/// Default status source for a running node
pub struct NodeInspector {
    node_id: String,
    metadata: BTreeMap<String, String>,
    store: SharedStore,
    system: Mutex<System>,
}

impl NodeInspector {
    pub fn new(node_id: String, metadata: BTreeMap<String, String>, store: SharedStore) -> Self {
        Self {
            node_id,
            metadata,
            store,
            system: Mutex::new(System::new()),
        }
    }

    fn collect_status(&self) -> NodeStatus {
        let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
        sys.refresh_memory();

        NodeStatus {
            hostname: get_hostname(),
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            memory_total_bytes: sys.total_memory(),
            memory_used_bytes: sys.used_memory(),
            uptime_secs: System::uptime(),
            agent_version: AGENT_VERSION.to_string(),
            timestamp: now(),
        }
    }
}

#[async_trait]
impl StatusSource for NodeInspector {
    async fn forward_info(&self) -> ForwardInfo {
        let mut metadata = self.metadata.clone();
        metadata.insert(NODE_ID_KEY.to_string(), self.node_id.clone());

        let apps = self.store.read().await.app_versions();

        ForwardInfo {
            metadata,
            status: Some(self.collect_status()),
            apps,
        }
    }
}

fn get_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
