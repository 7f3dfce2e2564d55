//! Report/desire synchronization with the control plane
//!
//! One cycle:
//! 1. Report node status, receive the pending delta
//! 2. Translate the delta into desired (type, name, version) entries
//! 3. Diff against the ledger; stop here if nothing is missing or stale
//! 4. Desire the missing bodies, decode and apply them
//! 5. Hand the changed identities to the workload layer
//!
//! Cycles are driven by [`SyncCoordinator`] on a fixed interval.

pub mod coordinator;
pub mod desire;
pub mod protocol;
pub mod reconciler;
pub mod report;
pub mod transport;

pub use coordinator::{SyncCoordinator, SyncStatus};
pub use desire::{ApplyOutcome, DesireClient};
pub use protocol::{BackwardInfo, DesireRequest, DesireResponse, ForwardInfo};
pub use reconciler::{ChangeSet, ReconcileOutcome, Reconciler};
pub use report::ReportClient;
pub use transport::{HttpTransport, SyncTransport};

/// Failures talking to the control plane below the HTTP layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// The control plane answered, but not with something usable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unauthorized: HTTP {status}")]
    Unauthorized { status: u16 },

    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Sync cycle errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
