//! Manager node: serves wrapper connections.
//!
//! Every accepted connection is bound to the shared dispatcher through
//! a [`DispatchHandler`]; requests from different connections (and on
//! the same connection) execute concurrently, each producing exactly
//! one response on the connection its query arrived on.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::dispatch::CommandDispatcher;
use crate::protocol;
use crate::transport::{self, Connection, FrameHandler, TcpConnectionListener};

/// Binds one wrapper connection's inbound queries to the dispatcher.
///
/// Responses go through an internal queue drained by a single writer
/// task, so concurrent request completions never interleave frames.
pub struct DispatchHandler {
    dispatcher: Arc<CommandDispatcher>,
    /// Taken on close so the writer task winds down.
    responses: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
}

impl DispatchHandler {
    /// Wire a connection to the dispatcher and start consuming frames.
    pub async fn bind(
        dispatcher: Arc<CommandDispatcher>,
        connection: Arc<dyn Connection>,
    ) -> transport::Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        let handler = Arc::new(Self {
            dispatcher,
            responses: Mutex::new(Some(tx)),
        });
        connection.subscribe(handler).await;
        connection.start_consuming().await?;

        // Response writer; exits once the handler closes and in-flight
        // requests finish.
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = connection.send(frame).await {
                    warn!(error = %e, "failed to write response");
                    break;
                }
            }
        });

        Ok(())
    }
}

impl FrameHandler for DispatchHandler {
    fn on_frame(&self, frame: Bytes) {
        let query = match protocol::decode_query(&frame) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "discarding malformed query frame");
                return;
            }
        };

        let Some(responses) = self
            .responses
            .lock()
            .expect("response queue poisoned")
            .clone()
        else {
            return;
        };

        // Execute off the read task; one task per request.
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let response = dispatcher.handle_query(query);
            match protocol::encode_response(&response) {
                Ok(frame) => {
                    let _ = responses.send(frame);
                }
                Err(e) => warn!(error = %e, "failed to encode response"),
            }
        });
    }

    fn on_closed(&self) {
        info!("wrapper connection closed");
        self.responses
            .lock()
            .expect("response queue poisoned")
            .take();
    }
}

/// The manager's accept loop.
pub struct ManagerServer {
    dispatcher: Arc<CommandDispatcher>,
}

impl ManagerServer {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Accept wrapper connections forever, binding each to the shared
    /// dispatcher.
    pub async fn serve(&self, listener: TcpConnectionListener) -> transport::Result<()> {
        loop {
            let connection = Arc::new(listener.accept().await?);
            info!(peer = %connection.peer(), "wrapper connected");
            if let Err(e) = DispatchHandler::bind(self.dispatcher.clone(), connection).await {
                warn!(error = %e, "failed to start wrapper connection");
            }
        }
    }
}
