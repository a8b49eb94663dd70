//! In-process connection pair over tokio channels.
//!
//! The counterpart of the TCP transport for tests and single-process
//! setups: `pair()` yields two linked ends, each satisfying
//! [`Connection`], with no sockets involved.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::{Connection, FrameHandler, Result, TransportError};

/// One end of an in-process frame connection.
pub struct ChannelConnection {
    /// Dropped on close so the peer's read loop observes the end.
    tx: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    /// Taken by the first `start_consuming` call.
    rx: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    handler: RwLock<Option<Arc<dyn FrameHandler>>>,
}

impl ChannelConnection {
    /// Create two linked ends; frames sent on one arrive on the other.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self::new(left_tx, left_rx)),
            Arc::new(Self::new(right_tx, right_rx)),
        )
    }

    fn new(tx: mpsc::UnboundedSender<Bytes>, rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            handler: RwLock::new(None),
        }
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn send(&self, frame: Bytes) -> Result<()> {
        let guard = self.tx.lock().await;
        let tx = guard.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn subscribe(&self, handler: Arc<dyn FrameHandler>) {
        *self.handler.write().await = Some(handler);
    }

    async fn start_consuming(&self) -> Result<()> {
        let mut rx = match self.rx.lock().await.take() {
            Some(rx) => rx,
            None => return Ok(()),
        };
        let handler = self
            .handler
            .read()
            .await
            .clone()
            .ok_or(TransportError::NoHandler)?;

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                handler.on_frame(frame);
            }
            handler.on_closed();
        });

        Ok(())
    }

    async fn close(&self) {
        self.tx.lock().await.take();
    }
}
