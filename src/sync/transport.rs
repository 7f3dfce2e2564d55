//! HTTP transport to the control plane

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::protocol::{BackwardInfo, DesireRequest, DesireResponse, ForwardInfo};
use super::{ProtocolError, SyncError, TransportError};
use crate::config::RemoteConfig;

/// The two remote exchanges a sync cycle needs
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn report(&self, info: &ForwardInfo) -> Result<BackwardInfo, SyncError>;

    async fn desire(&self, request: &DesireRequest) -> Result<DesireResponse, SyncError>;
}

/// JSON-over-HTTP transport
pub struct HttpTransport {
    client: reqwest::Client,
    report_url: String,
    desire_url: String,
}

impl HttpTransport {
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .no_proxy();

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| TransportError::Request(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                TransportError::Tls(format!("reading CA bundle {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| TransportError::Tls(e.to_string()))?;

        Ok(Self {
            client,
            report_url: config.report_url(),
            desire_url: config.desire_url(),
        })
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, SyncError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProtocolError::Unauthorized {
                status: status.as_u16(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(ProtocolError::ServerError {
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(classify)?;
        debug!(url, bytes = bytes.len(), "Received response");

        // An empty body is an empty message
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(body)
            .map_err(|e| ProtocolError::MalformedResponse(e.to_string()).into())
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn report(&self, info: &ForwardInfo) -> Result<BackwardInfo, SyncError> {
        self.post_json(&self.report_url, info).await
    }

    async fn desire(&self, request: &DesireRequest) -> Result<DesireResponse, SyncError> {
        self.post_json(&self.desire_url, request).await
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if mentions_tls(&err) {
        TransportError::Tls(err.to_string())
    } else if err.is_connect() {
        TransportError::ConnectionRefused(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

/// reqwest has no TLS error kind; inspect the causes below the top-level
/// message, which embeds the URL.
fn mentions_tls(err: &reqwest::Error) -> bool {
    use std::error::Error;

    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        current = e.source();
    }
    false
}
