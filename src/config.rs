//! Agent configuration
//!
//! Loaded once at startup from TOML and handed to each component's
//! constructor; nothing reads configuration from global state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    #[serde(default = "default_node_id")]
    pub id: String,

    /// Static metadata attached to every report
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    /// How long shutdown waits for an in-flight exchange
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

/// Control plane endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the control plane
    #[serde(default = "default_address")]
    pub address: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// PEM bundle of extra trusted CA certificates
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Accept any server certificate (test setups only)
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Explicit HTTP(S) proxy; environment proxy settings are not used
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub desire: DesireConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Path (joined to the address) or absolute URL
    #[serde(default = "default_report_url")]
    pub url: String,

    /// Report interval in seconds
    #[serde(default = "default_report_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesireConfig {
    /// Path (joined to the address) or absolute URL
    #[serde(default = "default_desire_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Serve the local status API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

// Defaults
fn default_node_id() -> String { "node-1".to_string() }
fn default_shutdown_grace() -> u64 { 5 }
fn default_address() -> String { "https://127.0.0.1:9004".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_report_url() -> String { "/v1/sync/report".to_string() }
fn default_report_interval() -> u64 { 20 }
fn default_desire_url() -> String { "/v1/sync/desire".to_string() }
fn default_true() -> bool { true }
fn default_http_port() -> u16 { 8080 }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            metadata: BTreeMap::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_secs: default_timeout(),
            ca_cert: None,
            insecure_skip_verify: false,
            proxy: None,
            report: ReportConfig::default(),
            desire: DesireConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            url: default_report_url(),
            interval_secs: default_report_interval(),
        }
    }
}

impl Default for DesireConfig {
    fn default() -> Self {
        Self {
            url: default_desire_url(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            http_port: default_http_port(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl SyncConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        // A zero timeout fails every request; clamp to one second
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn report_interval(&self) -> Duration {
        // A zero interval would spin; clamp to one second
        Duration::from_secs(self.report.interval_secs.max(1))
    }

    pub fn report_url(&self) -> String {
        endpoint(&self.address, &self.report.url)
    }

    pub fn desire_url(&self) -> String {
        endpoint(&self.address, &self.desire.url)
    }
}

fn endpoint(address: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            address.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, String),

    #[error("Invalid configuration: {0}")]
    Parse(String),
}
