//! Cluster-wide failure taxonomy.
//!
//! Every failure in the RPC core surfaces to the originating caller as a
//! rejected promise carrying one of these variants. The only failure that
//! is deliberately absorbed is an unknown correlation id on the response
//! path, which cannot be attributed to any live call and is logged and
//! dropped by the client instead.

use std::time::Duration;

/// Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can reject a cluster operation.
///
/// Variants are `Clone` because a promise may hand the same outcome to
/// several registered continuations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The connection to the manager dropped with calls outstanding.
    #[error("connection to the manager was lost")]
    ConnectionLost,

    /// No response arrived within the bounded query timeout.
    #[error("no response for '{operation}' within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The manager-side execution of the operation failed.
    #[error("remote execution of '{operation}' failed: {message}")]
    Remote { operation: String, message: String },

    /// The response payload does not conform to the expected result shape.
    #[error("response for '{expected}' could not be decoded: {message}")]
    Decode { expected: String, message: String },

    /// A chained lookup found no service under the confirmed name.
    #[error("no service named '{0}' is known")]
    ServiceNotFound(String),

    /// The dispatcher has no handler registered under this name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// A frame could not be written to the underlying connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request could not be serialized before sending.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ClusterError {
    /// Returns true if this failure came from the connection itself
    /// rather than from the remote operation.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClusterError::ConnectionLost | ClusterError::Transport(_)
        )
    }

    /// Returns true if the remote side executed the operation and failed.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, ClusterError::Remote { .. })
    }

    /// Returns true if this is a bounded-timeout rejection.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Timeout { .. })
    }
}
