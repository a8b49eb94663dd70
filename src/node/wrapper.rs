//! Wrapper node bootstrap.
//!
//! Connects to the manager with retry/backoff and assembles the node's
//! RPC stack: client, gateway, orchestrator. The wrapper's synchronized
//! view of running services is supplied by the caller; how it is kept
//! in sync is outside the RPC core.

use std::sync::Arc;

use tracing::info;

use crate::client::QueryClient;
use crate::config::Config;
use crate::error::ClusterError;
use crate::gateway::{ClusterGateway, NodeIdentity};
use crate::orchestration::ServiceOrchestrator;
use crate::registry::ServiceLookup;
use crate::transport::TcpConnection;
use crate::utils::bootstrap::connect_with_retry;

/// A connected wrapper node.
pub struct WrapperNode {
    gateway: Arc<ClusterGateway>,
    orchestrator: ServiceOrchestrator,
}

impl WrapperNode {
    /// Connect to the manager and assemble the RPC stack.
    pub async fn connect(
        config: &Config,
        lookup: Arc<dyn ServiceLookup>,
    ) -> Result<Self, ClusterError> {
        let identity = NodeIdentity::new(&config.node.name);
        let addr = config.transport.addr();

        let connection = connect_with_retry("manager", &addr, || TcpConnection::connect(&addr))
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        let client = QueryClient::start(Arc::new(connection), config.rpc.query_timeout())
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        info!(node = %identity.name(), manager = %addr, "wrapper node ready");
        let gateway = Arc::new(ClusterGateway::for_wrapper(identity, client));
        let orchestrator = ServiceOrchestrator::new(gateway.clone(), lookup);
        Ok(Self {
            gateway,
            orchestrator,
        })
    }

    /// The node's location-transparent dispatch entry point.
    pub fn gateway(&self) -> &Arc<ClusterGateway> {
        &self.gateway
    }

    /// Group and service lifecycle flows.
    pub fn orchestrator(&self) -> &ServiceOrchestrator {
        &self.orchestrator
    }
}
