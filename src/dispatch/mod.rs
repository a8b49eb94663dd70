//! Manager-side command dispatcher.
//!
//! Executes a received operation synchronously against the
//! authoritative registries and produces exactly one response envelope
//! per query envelope, correlated by operation id. Execution is
//! at-most-once per received request; the dispatcher never retries —
//! a retry is always a brand-new query from the client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClusterError;
use crate::protocol::{OperationRequest, QueryEnvelope, RemoteFailure, ResponseEnvelope};
use crate::registry::{GroupRegistry, RegistryError, ServiceRegistry};


/// A computation pre-registered for manager-side execution.
///
/// The restricted survivor of the "ship a function to the manager"
/// pattern: the handler runs at most once per received request, against
/// current state, with no isolation. Callers keep its effects scoped to
/// manager-local data and declare the expected result tag at the call
/// site.
pub trait OperationHandler: Send + Sync {
    fn execute(&self, args: Value) -> Result<Value, ClusterError>;
}

impl<F> OperationHandler for F
where
    F: Fn(Value) -> Result<Value, ClusterError> + Send + Sync,
{
    fn execute(&self, args: Value) -> Result<Value, ClusterError> {
        self(args)
    }
}

/// Executes operations against manager-owned authoritative state.
pub struct CommandDispatcher {
    groups: Arc<GroupRegistry>,
    services: Arc<ServiceRegistry>,
    handlers: RwLock<HashMap<String, Arc<dyn OperationHandler>>>,
}

impl CommandDispatcher {
    pub fn new(groups: Arc<GroupRegistry>, services: Arc<ServiceRegistry>) -> Self {
        Self {
            groups,
            services,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a named computation reachable through
    /// [`OperationRequest::Invoke`].
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn OperationHandler>) {
        let name = name.into();
        debug!(operation = %name, "invoke handler registered");
        self.handlers
            .write()
            .expect("handler registry poisoned")
            .insert(name, handler);
    }

    /// Execute one operation against authoritative state.
    pub fn execute(&self, request: &OperationRequest) -> Result<Value, ClusterError> {
        match request {
            OperationRequest::CreateServiceGroup(group) => {
                let confirmed = self
                    .groups
                    .create(group.clone())
                    .map_err(|e| remote(request, &e))?;
                serde_json::to_value(confirmed).map_err(|e| ClusterError::Encode(e.to_string()))
            }
            OperationRequest::StartService(config) => {
                let group = self.groups.group_by_name(&config.group_name).ok_or_else(|| {
                    remote(request, &RegistryError::UnknownGroup(config.group_name.clone()))
                })?;
                let instance = self
                    .services
                    .schedule(&group, config)
                    .map_err(|e| remote(request, &e))?;
                // The caller gets the generated name as soon as the
                // instance is scheduled, before it is fully running.
                Ok(Value::String(instance.name))
            }
            OperationRequest::Invoke { name, args } => {
                let handler = self
                    .handlers
                    .read()
                    .expect("handler registry poisoned")
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ClusterError::UnknownOperation(name.clone()))?;
                handler.execute(args.clone())
            }
        }
    }

    /// Handle one inbound query, producing its single correlated
    /// response. Never panics the caller: every failure becomes an
    /// error response.
    pub fn handle_query(&self, query: QueryEnvelope) -> ResponseEnvelope {
        let operation = query.request.name();

        // Canonical operations promise a fixed result shape; refuse a
        // query whose declared tag disagrees before executing anything.
        if let Some(expected) = query.request.canonical_result_tag() {
            if query.result_tag != expected {
                warn!(
                    operation,
                    declared = %query.result_tag,
                    expected,
                    "query refused, result tag mismatch"
                );
                return ResponseEnvelope::error(
                    query.operation_id,
                    RemoteFailure::new(
                        operation,
                        format!(
                            "declared result tag '{}' does not match '{expected}'",
                            query.result_tag
                        ),
                    ),
                );
            }
        }

        debug!(operation, operation_id = query.operation_id, "executing query");
        match self.execute(&query.request) {
            Ok(value) => ResponseEnvelope::result(query.operation_id, value),
            Err(ClusterError::Remote { operation, message }) => {
                ResponseEnvelope::error(query.operation_id, RemoteFailure::new(operation, message))
            }
            Err(other) => ResponseEnvelope::error(
                query.operation_id,
                RemoteFailure::new(operation, other.to_string()),
            ),
        }
    }
}

fn remote(request: &OperationRequest, error: &RegistryError) -> ClusterError {
    ClusterError::Remote {
        operation: request.name().to_string(),
        message: error.to_string(),
    }
}
