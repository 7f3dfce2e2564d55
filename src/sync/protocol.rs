//! Report/desire wire protocol

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;

use crate::resource::BaseResource;
use crate::status::NodeStatus;

/// Pushed upstream on every report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardInfo {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Node status snapshot
    #[serde(default)]
    pub status: Option<NodeStatus>,

    /// Applied application versions (name -> version)
    #[serde(default)]
    pub apps: BTreeMap<String, String>,
}

/// Returned by the control plane in answer to a report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackwardInfo {
    /// Pending desired-state entries
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub delta: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Request for full resource bodies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesireRequest {
    pub resources: Vec<BaseResource>,
}

/// Resource bodies returned for a desire request
///
/// Entries are kept as raw JSON so each one is decoded from its exact wire
/// bytes, and a bad entry does not spoil the rest of the batch.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DesireResponse {
    #[serde(default)]
    pub resources: Vec<Box<RawValue>>,
}
