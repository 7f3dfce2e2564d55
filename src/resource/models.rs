//! Typed payloads carried in a resource's `value` slot
//!
//! Every field defaults when absent so a sparse payload from the control
//! plane still decodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of configuration data keys that point at an object in remote storage
pub const OBJECT_KEY_PREFIX: &str = "_object_";

/// Desired application: a set of services plus the volumes they mount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub namespace: String,
    pub version: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub services: Vec<Service>,
    pub volumes: Vec<Volume>,
}

/// A single workload inside an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    pub image: String,
    pub replica: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    pub ports: Vec<ContainerPort>,
    pub env: Vec<Environment>,
    pub args: Vec<String>,
    pub devices: Vec<VolumeDevice>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerPort {
    pub host_port: u16,
    pub container_port: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub name: String,
    pub value: String,
}

/// Host device exposed to a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeDevice {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

/// Named volume; exactly one source is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_path: Option<HostPathVolumeSource>,
}

/// Reference to another resource by name and version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectReference {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPathVolumeSource {
    pub path: String,
}

impl Application {
    /// Configurations this application mounts, as (name, version) references
    pub fn config_refs(&self) -> impl Iterator<Item = &ObjectReference> {
        self.volumes.iter().filter_map(|v| v.config.as_ref())
    }
}

/// Desired configuration: a flat key/value document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub name: String,
    pub namespace: String,
    pub version: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}

/// Pointer to a configuration item held in object storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageObject {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub compression: String,
}

impl Configuration {
    /// Data entries that describe storage objects, keyed by the name after
    /// the `_object_` prefix. Entries whose body is not a valid object are
    /// returned as errors so the caller decides whether to skip them.
    pub fn objects(&self) -> Vec<(String, Result<StorageObject, serde_json::Error>)> {
        self.data
            .iter()
            .filter_map(|(key, raw)| {
                key.strip_prefix(OBJECT_KEY_PREFIX)
                    .map(|name| (name.to_string(), serde_json::from_str(raw)))
            })
            .collect()
    }
}
