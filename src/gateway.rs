//! Role-transparent dispatch facade.
//!
//! One entry point for manager operations regardless of where this
//! process runs: the manager executes in-process and hands back an
//! already-completed promise; a wrapper ships the query and hands back
//! the client's pending promise unchanged. Call sites never branch on
//! node role.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::QueryClient;
use crate::dispatch::CommandDispatcher;
use crate::error::ClusterError;
use crate::promise::Promise;
use crate::protocol::OperationRequest;

/// Reserved node name distinguishing the manager from wrappers.
pub const MANAGER_NODE_NAME: &str = "Manager";

/// Identity of this node, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    name: String,
    is_manager: bool,
}

impl NodeIdentity {
    /// Derive an identity from the node name; the reserved name marks
    /// the manager.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_manager = name == MANAGER_NODE_NAME;
        Self { name, is_manager }
    }

    /// The manager's own identity.
    pub fn manager() -> Self {
        Self::new(MANAGER_NODE_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_manager(&self) -> bool {
        self.is_manager
    }
}

/// Where this node executes manager operations.
enum Executor {
    /// This node is the manager; operations run in-process.
    Local(Arc<CommandDispatcher>),
    /// Operations are shipped over the wire.
    Remote(QueryClient),
}

/// Location-transparent entry point for manager operations.
pub struct ClusterGateway {
    identity: NodeIdentity,
    executor: Executor,
}

impl ClusterGateway {
    /// Gateway for the manager process itself.
    pub fn for_manager(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            identity: NodeIdentity::manager(),
            executor: Executor::Local(dispatcher),
        }
    }

    /// Gateway for a wrapper holding a client connection to the manager.
    pub fn for_wrapper(identity: NodeIdentity, client: QueryClient) -> Self {
        debug_assert!(!identity.is_manager(), "wrapper gateway with manager identity");
        Self {
            identity,
            executor: Executor::Remote(client),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Dispatch an operation to wherever it executes.
    ///
    /// The execution-site decision happens exactly once, here. On the
    /// manager the operation runs synchronously on the calling context
    /// and the returned promise is already complete — no frame is ever
    /// constructed. On a wrapper the promise completes later, on the
    /// connection's read task.
    pub fn dispatch<T>(&self, request: OperationRequest, result_tag: &'static str) -> Promise<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        match &self.executor {
            Executor::Local(dispatcher) => match dispatcher.execute(&request) {
                Ok(value) => match serde_json::from_value::<T>(value) {
                    Ok(decoded) => Promise::of(decoded),
                    Err(e) => Promise::rejected(ClusterError::Decode {
                        expected: result_tag.to_string(),
                        message: e.to_string(),
                    }),
                },
                Err(error) => Promise::rejected(error),
            },
            Executor::Remote(client) => client.send_query(request, result_tag),
        }
    }
}
