//! cumulus-wrapper: a subordinate node hosting service instances.
//!
//! Connects to the manager (with retry/backoff) and keeps the RPC
//! stack alive until interrupted.
//!
//! ## Configuration
//! - `CUMULUS_CONFIG` or first argument: YAML config path
//! - `CUMULUS__NODE__NAME`: this wrapper's name (e.g. "Wrapper-1")
//! - `CUMULUS__TRANSPORT__HOST` / `CUMULUS__TRANSPORT__PORT`: manager
//! - `CUMULUS_LOG`: tracing filter (default "info")

use std::sync::Arc;

use tracing::{error, info};

use cumulus::config::Config;
use cumulus::node::WrapperNode;
use cumulus::registry::ServiceRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    cumulus::utils::bootstrap::init_tracing();

    let config_path = cumulus::utils::bootstrap::parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(node = %config.node.name, "Starting cumulus wrapper");

    // This node's view of running services, kept in sync outside the
    // RPC core.
    let services = Arc::new(ServiceRegistry::new());
    let node = WrapperNode::connect(&config, services).await?;
    info!(
        node = %node.gateway().identity().name(),
        "connected, awaiting shutdown signal"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
