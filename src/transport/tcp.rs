//! Length-prefixed frame transport over TCP.
//!
//! Wire format: a 4-byte big-endian length prefix followed by the frame
//! payload. Frames above [`MAX_FRAME_BYTES`] are refused on send and
//! terminate the connection on receive.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::{Connection, FrameHandler, Result, TransportError, MAX_FRAME_BYTES};

/// One TCP frame connection.
pub struct TcpConnection {
    peer: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
    /// Taken by the first `start_consuming` call.
    reader: Mutex<Option<OwnedReadHalf>>,
    handler: RwLock<Option<Arc<dyn FrameHandler>>>,
}

impl TcpConnection {
    /// Connect to a listening peer.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!(%addr, "connected");
        Self::from_stream(stream)
    }

    /// Wrap an accepted stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            peer,
            writer: Mutex::new(writer),
            reader: Mutex::new(Some(reader)),
            handler: RwLock::new(None),
        })
    }

    /// Remote address of this connection.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&self, frame: Bytes) -> Result<()> {
        if frame.len() > MAX_FRAME_BYTES {
            return Err(TransportError::FrameTooLarge(frame.len()));
        }
        let len = (frame.len() as u32).to_be_bytes();
        let mut writer = self.writer.lock().await;
        writer.write_all(&len).await?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn subscribe(&self, handler: Arc<dyn FrameHandler>) {
        *self.handler.write().await = Some(handler);
    }

    async fn start_consuming(&self) -> Result<()> {
        let mut reader = match self.reader.lock().await.take() {
            Some(reader) => reader,
            None => return Ok(()),
        };
        let handler = self
            .handler
            .read()
            .await
            .clone()
            .ok_or(TransportError::NoHandler)?;
        let peer = self.peer;

        tokio::spawn(async move {
            loop {
                let mut len_buf = [0u8; 4];
                match reader.read_exact(&mut len_buf).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        debug!(%peer, "connection closed by peer");
                        break;
                    }
                    Err(e) => {
                        warn!(%peer, error = %e, "read error");
                        break;
                    }
                }

                let len = u32::from_be_bytes(len_buf) as usize;
                if len > MAX_FRAME_BYTES {
                    error!(%peer, len, "inbound frame exceeds maximum size");
                    break;
                }

                let mut buf = vec![0u8; len];
                if let Err(e) = reader.read_exact(&mut buf).await {
                    warn!(%peer, error = %e, "failed to read frame body");
                    break;
                }

                handler.on_frame(Bytes::from(buf));
            }
            handler.on_closed();
        });

        Ok(())
    }

    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown on closed connection");
        }
    }
}

/// Accepts inbound TCP frame connections.
pub struct TcpConnectionListener {
    listener: TcpListener,
}

impl TcpConnectionListener {
    /// Bind to the given address.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "listening for connections");
        Ok(Self { listener })
    }

    /// The bound local address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next inbound connection.
    pub async fn accept(&self) -> Result<TcpConnection> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "accepted connection");
        TcpConnection::from_stream(stream)
    }
}
