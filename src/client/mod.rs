//! Remote invocation client: correlated queries over one connection.
//!
//! `send_query` registers a pending promise in the outstanding-call
//! table, writes the query envelope without blocking the caller, and
//! returns the promise immediately. Inbound responses settle exactly
//! their own entry; connection loss drains the whole table. Responses
//! that match no outstanding call are the one failure class absorbed
//! here: logged and dropped, never fatal to the read path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClusterError;
use crate::promise::Promise;
use crate::protocol::{self, OperationRequest, QueryEnvelope};
use crate::transport::{Connection, FrameHandler, TransportError};


/// Default bound on how long a query may stay outstanding.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

type Completer = Box<dyn FnOnce(Result<Value, ClusterError>) + Send>;

struct PendingCall {
    operation: &'static str,
    complete: Completer,
}

struct ClientInner {
    connection: Arc<dyn Connection>,
    next_operation_id: AtomicU64,
    outstanding: Mutex<HashMap<u64, PendingCall>>,
    query_timeout: Duration,
}

impl ClientInner {
    /// Remove and complete one outstanding entry. Returns `false` when
    /// the id is not (or no longer) outstanding.
    fn settle(&self, operation_id: u64, outcome: Result<Value, ClusterError>) -> bool {
        let entry = self
            .outstanding
            .lock()
            .expect("outstanding-call table poisoned")
            .remove(&operation_id);
        match entry {
            Some(call) => {
                (call.complete)(outcome);
                true
            }
            None => false,
        }
    }

    /// Atomically drain the table, rejecting every entry.
    fn drain(&self) {
        let drained: Vec<PendingCall> = {
            let mut outstanding = self
                .outstanding
                .lock()
                .expect("outstanding-call table poisoned");
            std::mem::take(&mut *outstanding).into_values().collect()
        };
        if drained.is_empty() {
            return;
        }
        warn!(
            calls = drained.len(),
            "connection lost, rejecting outstanding calls"
        );
        for call in drained {
            (call.complete)(Err(ClusterError::ConnectionLost));
        }
    }
}

/// Settles inbound response frames against the outstanding-call table.
struct ResponseHandler {
    inner: Weak<ClientInner>,
}

impl FrameHandler for ResponseHandler {
    fn on_frame(&self, frame: Bytes) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let envelope = match protocol::decode_response(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "discarding malformed response frame");
                return;
            }
        };
        let outcome = envelope.outcome.map_err(ClusterError::from);
        if !inner.settle(envelope.operation_id, outcome) {
            warn!(
                operation_id = envelope.operation_id,
                "response with unknown correlation id discarded"
            );
        }
    }

    fn on_closed(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain();
        }
    }
}

/// Per-node client shipping queries to the manager.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    /// Create a client over an established connection and start its
    /// read loop.
    pub async fn start(
        connection: Arc<dyn Connection>,
        query_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let inner = Arc::new(ClientInner {
            connection: connection.clone(),
            next_operation_id: AtomicU64::new(0),
            outstanding: Mutex::new(HashMap::new()),
            query_timeout,
        });
        connection
            .subscribe(Arc::new(ResponseHandler {
                inner: Arc::downgrade(&inner),
            }))
            .await;
        connection.start_consuming().await?;
        Ok(Self { inner })
    }

    /// Ship a query and return a promise of its decoded result.
    ///
    /// Returns immediately; the promise completes on the connection's
    /// read task when the correlated response arrives, or rejects on
    /// write failure, timeout, or connection loss. `result_tag` names
    /// the result shape both sides agreed on for this operation.
    pub fn send_query<T>(&self, request: OperationRequest, result_tag: &'static str) -> Promise<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let operation = request.name();
        let operation_id = self.inner.next_operation_id.fetch_add(1, Ordering::Relaxed) + 1;
        let promise = Promise::pending();

        let typed = promise.clone();
        let completer: Completer = Box::new(move |outcome| match outcome {
            Ok(value) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => {
                    typed.resolve(decoded);
                }
                Err(e) => {
                    typed.reject(ClusterError::Decode {
                        expected: result_tag.to_string(),
                        message: e.to_string(),
                    });
                }
            },
            Err(error) => {
                typed.reject(error);
            }
        });

        self.inner
            .outstanding
            .lock()
            .expect("outstanding-call table poisoned")
            .insert(
                operation_id,
                PendingCall {
                    operation,
                    complete: completer,
                },
            );
        debug!(operation, operation_id, "query registered");

        let envelope = QueryEnvelope {
            operation_id,
            result_tag: result_tag.to_string(),
            request,
        };
        let frame = match protocol::encode_query(&envelope) {
            Ok(frame) => frame,
            Err(e) => {
                self.inner.settle(operation_id, Err(e));
                return promise;
            }
        };

        // Write off the caller's context; a failed write settles only
        // this call.
        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Err(e) = inner.connection.send(frame).await {
                inner.settle(operation_id, Err(ClusterError::Transport(e.to_string())));
            }
        });

        // Bounded timeout watchdog. Retries are a caller decision,
        // expressed as a brand-new query.
        let inner = self.inner.clone();
        let timeout = self.inner.query_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if inner.settle(operation_id, Err(ClusterError::Timeout { operation, timeout })) {
                debug!(operation, operation_id, "query timed out");
            }
        });

        promise
    }

    /// Number of calls currently awaiting a response.
    pub fn outstanding_calls(&self) -> usize {
        self.inner
            .outstanding
            .lock()
            .expect("outstanding-call table poisoned")
            .len()
    }
}
