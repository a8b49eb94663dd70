//! cumulus-manager: the cluster's authoritative node.
//!
//! Owns the service-group and service registries and serves wrapper
//! connections on the configured frame listener.
//!
//! ## Configuration
//! - `CUMULUS_CONFIG` or first argument: YAML config path
//! - `CUMULUS__TRANSPORT__HOST` / `CUMULUS__TRANSPORT__PORT`: listener
//! - `CUMULUS_LOG`: tracing filter (default "info")

use std::sync::Arc;

use tracing::{error, info};

use cumulus::config::Config;
use cumulus::dispatch::CommandDispatcher;
use cumulus::node::ManagerServer;
use cumulus::registry::{GroupRegistry, ServiceRegistry};
use cumulus::transport::TcpConnectionListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    cumulus::utils::bootstrap::init_tracing();

    let config_path = cumulus::utils::bootstrap::parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting cumulus manager");

    let groups = Arc::new(GroupRegistry::new());
    let services = Arc::new(ServiceRegistry::new());
    let dispatcher = Arc::new(CommandDispatcher::new(groups, services));

    let listener = TcpConnectionListener::bind(&config.transport.addr()).await?;
    ManagerServer::new(dispatcher).serve(listener).await?;

    Ok(())
}
