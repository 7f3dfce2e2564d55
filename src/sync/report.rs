//! Report exchange: push node status, receive the pending delta

use std::sync::Arc;
use tracing::debug;

use super::protocol::{BackwardInfo, ForwardInfo};
use super::transport::SyncTransport;
use super::SyncError;

pub struct ReportClient {
    transport: Arc<dyn SyncTransport>,
}

impl ReportClient {
    pub fn new(transport: Arc<dyn SyncTransport>) -> Self {
        Self { transport }
    }

    pub async fn report(&self, info: &ForwardInfo) -> Result<BackwardInfo, SyncError> {
        debug!(apps = info.apps.len(), "Sending report");
        let backward = self.transport.report(info).await?;
        debug!(
            delta_keys = backward.delta.len(),
            metadata_keys = backward.metadata.len(),
            "Report acknowledged"
        );
        Ok(backward)
    }
}
