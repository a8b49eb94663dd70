//! Wire model for correlated manager queries and responses.
//!
//! This module contains:
//! - `OperationRequest`: the closed, versioned set of manager operations
//! - `QueryEnvelope` / `ResponseEnvelope`: the correlated exchange pair
//! - `RemoteFailure`: the wire form of a manager-side failure
//! - Frame encode/decode helpers (serde_json payloads)
//!
//! Result-type recovery across the network uses an explicit result tag
//! both sides agree on ahead of time; the client selects its decoder by
//! that tag, never by runtime reflection.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClusterError;
use crate::model::{ServiceGroup, ServiceStartConfiguration};


/// Result tags for the canonical operations.
pub mod result_tag {
    /// A confirmed [`crate::model::ServiceGroup`] descriptor.
    pub const SERVICE_GROUP: &str = "service-group";
    /// The generated name of a newly scheduled service.
    pub const SERVICE_NAME: &str = "service-name";
}

/// An operation shipped to the manager.
///
/// This is a closed set: arbitrary computations never cross the wire.
/// One-off manager-side logic goes through `Invoke`, which names a
/// handler pre-registered on the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "kebab-case")]
pub enum OperationRequest {
    /// Create a service group in the manager's authoritative registry.
    /// Resolves with the confirmed descriptor, defaults filled in.
    CreateServiceGroup(ServiceGroup),
    /// Schedule a new service instance. Resolves with the generated
    /// unique service name as soon as the instance is scheduled.
    StartService(ServiceStartConfiguration),
    /// Run a computation pre-registered on the manager under `name`.
    Invoke {
        name: String,
        #[serde(default)]
        args: Value,
    },
}

impl OperationRequest {
    /// Stable operation name for logging and failure attribution.
    pub fn name(&self) -> &'static str {
        match self {
            OperationRequest::CreateServiceGroup(_) => "create-service-group",
            OperationRequest::StartService(_) => "start-service",
            OperationRequest::Invoke { .. } => "invoke",
        }
    }

    /// The result tag a canonical operation answers with.
    ///
    /// `Invoke` results are shaped by the registered handler, so the
    /// caller declares the expected tag at the call site instead.
    pub fn canonical_result_tag(&self) -> Option<&'static str> {
        match self {
            OperationRequest::CreateServiceGroup(_) => Some(result_tag::SERVICE_GROUP),
            OperationRequest::StartService(_) => Some(result_tag::SERVICE_NAME),
            OperationRequest::Invoke { .. } => None,
        }
    }
}

/// Manager-side failure as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFailure {
    /// Name of the failing operation.
    pub operation: String,
    /// Cause, sufficient to identify the failure at the caller.
    pub message: String,
}

impl RemoteFailure {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<RemoteFailure> for ClusterError {
    fn from(failure: RemoteFailure) -> Self {
        ClusterError::Remote {
            operation: failure.operation,
            message: failure.message,
        }
    }
}

/// Request half of one correlated exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEnvelope {
    /// Unique among the sending connection's outstanding calls.
    pub operation_id: u64,
    /// Result shape the caller expects; see [`result_tag`].
    pub result_tag: String,
    /// The operation to execute.
    pub request: OperationRequest,
}

/// Response half; `operation_id` matches exactly one outstanding query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub operation_id: u64,
    pub outcome: Result<Value, RemoteFailure>,
}

impl ResponseEnvelope {
    /// Successful response carrying the result payload.
    pub fn result(operation_id: u64, value: Value) -> Self {
        Self {
            operation_id,
            outcome: Ok(value),
        }
    }

    /// Failed response carrying the manager-side failure.
    pub fn error(operation_id: u64, failure: RemoteFailure) -> Self {
        Self {
            operation_id,
            outcome: Err(failure),
        }
    }
}

/// Serialize a query envelope into an opaque transport frame.
pub fn encode_query(envelope: &QueryEnvelope) -> Result<Bytes, ClusterError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| ClusterError::Encode(e.to_string()))
}

/// Deserialize a query envelope from an inbound frame.
pub fn decode_query(frame: &[u8]) -> Result<QueryEnvelope, serde_json::Error> {
    serde_json::from_slice(frame)
}

/// Serialize a response envelope into an opaque transport frame.
pub fn encode_response(envelope: &ResponseEnvelope) -> Result<Bytes, ClusterError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| ClusterError::Encode(e.to_string()))
}

/// Deserialize a response envelope from an inbound frame.
pub fn decode_response(frame: &[u8]) -> Result<ResponseEnvelope, serde_json::Error> {
    serde_json::from_slice(frame)
}
