//! edge-sync: keeps an edge node's applied resources in step with the
//! desired state held by a remote control plane.
//!
//! The agent reports node status on a fixed interval, receives a delta of
//! desired resources, fetches the bodies it is missing or stale on, and
//! records what it applied in an in-memory version ledger. Changed
//! identities are handed to the workload layer over a channel.

pub mod api;
pub mod config;
pub mod resource;
pub mod status;
pub mod store;
pub mod sync;

pub use config::Config;
pub use resource::{BaseResource, Resource, ResourceKey, ResourceType, ResourceValue};
pub use store::{SharedStore, Store};
