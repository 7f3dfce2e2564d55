//! edge-sync: edge-node synchronization agent
//!
//! Reports node status to the control plane on a fixed interval, pulls the
//! resources it is missing, and serves a local status API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use edge_sync::api::{create_router, ApiState};
use edge_sync::status::NodeInspector;
use edge_sync::sync::{ChangeSet, HttpTransport, SyncCoordinator};
use edge_sync::{Config, Store};

#[derive(Parser)]
#[command(name = "edge-sync")]
#[command(about = "Edge-node synchronization agent")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "edge-sync.toml")]
    config: PathBuf,

    /// Node ID (overrides config file)
    #[arg(long, env = "EDGE_SYNC_NODE_ID")]
    node_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edge_sync=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting edge-sync");
    info!("Config file: {}", cli.config.display());

    // Load or create default config
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    if let Some(node_id) = cli.node_id {
        config.node.id = node_id;
    }

    info!("Node ID: {}", config.node.id);
    info!("Control plane: {}", config.sync.remote.address);

    let store = Store::shared();
    let transport = Arc::new(HttpTransport::new(&config.sync.remote)?);
    let inspector = Arc::new(NodeInspector::new(
        config.node.id.clone(),
        config.node.metadata.clone(),
        store.clone(),
    ));

    // Changed resources go to the workload layer; here they are only logged
    let (changes_tx, mut changes_rx) = mpsc::channel::<ChangeSet>(64);
    tokio::spawn(async move {
        while let Some(change_set) = changes_rx.recv().await {
            let keys: Vec<String> = change_set.keys.iter().map(ToString::to_string).collect();
            info!(count = keys.len(), resources = ?keys, "Resources changed");
        }
    });

    let coordinator = SyncCoordinator::new(
        transport,
        store.clone(),
        inspector,
        changes_tx,
        config.sync.remote.report_interval(),
        config.sync.shutdown_grace(),
    );
    let sync_status = coordinator.status();

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let sync_handle = tokio::spawn(coordinator.run(shutdown_rx));

    let api_handle = if config.api.enabled {
        let app = create_router(ApiState {
            node_id: config.node.id.clone(),
            store,
            sync_status,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Status API listening on http://{}", addr);
        Some(tokio::spawn(async move { axum::serve(listener, app).await }))
    } else {
        info!("Status API is disabled");
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(()).await;
    if let Err(e) = sync_handle.await {
        warn!(error = %e, "Sync task ended abnormally");
    }
    if let Some(handle) = api_handle {
        handle.abort();
    }

    info!("edge-sync stopped");
    Ok(())
}
