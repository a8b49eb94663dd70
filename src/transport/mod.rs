//! Frame transport abstraction over persistent duplex connections.
//!
//! This module contains:
//! - `Connection` trait: opaque frame writes plus an inbound callback
//! - `FrameHandler` trait: per-connection frame / closed callbacks
//! - Implementations: TCP (length-prefixed frames), in-process channel
//!
//! The RPC core treats frames as opaque bytes; envelope encoding lives
//! in [`crate::protocol`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub mod channel;
pub mod tcp;

pub use channel::ChannelConnection;
pub use tcp::{TcpConnection, TcpConnectionListener};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur on a frame connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("no frame handler subscribed")]
    NoHandler,
}

/// Upper bound on a single frame.
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Callbacks for one connection's inbound side.
///
/// Both callbacks run on the connection's read task; implementations
/// must be cheap and must not block.
pub trait FrameHandler: Send + Sync {
    /// One complete inbound frame.
    fn on_frame(&self, frame: Bytes);

    /// The connection delivers no further frames after this.
    fn on_closed(&self);
}

/// A persistent duplex frame connection.
///
/// Writes are serialized internally, so concurrent `send` calls never
/// interleave partial frames; `send` returns once the frame is written,
/// never waiting for any response.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write one frame.
    async fn send(&self, frame: Bytes) -> Result<()>;

    /// Register the handler for inbound frames. One handler per
    /// connection; registering again replaces the previous one.
    async fn subscribe(&self, handler: Arc<dyn FrameHandler>);

    /// Start the read loop delivering frames to the subscribed handler.
    /// Idempotent: a second call on a consuming connection is a no-op.
    async fn start_consuming(&self) -> Result<()>;

    /// Close the connection; the peer observes `on_closed`.
    async fn close(&self);
}
