//! Hub-side frame transports

use async_trait::async_trait;
use shared::message::{FRAME_HEADER_LEN, Frame};
use std::sync::{Arc, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};

use crate::error::{HubError, HubResult};

/// One client connection as seen by the hub
///
/// A session reads on one task while forwarders write from others.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_frame(&self) -> HubResult<Frame>;
    async fn write_frame(&self, frame: &Frame) -> HubResult<()>;
    async fn close(&self) -> HubResult<()>;
}

#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub fn from_stream(stream: TcpStream) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }
        let (reader, writer) = stream.into_split();
        Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_frame(&self) -> HubResult<Frame> {
        let mut reader = self.reader.lock().await;

        let mut header = [0u8; FRAME_HEADER_LEN];
        reader.read_exact(&mut header).await?;
        let (kind, request_id, len) = Frame::decode_header(&header)?;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;

        Ok(Frame {
            request_id,
            kind,
            payload,
        })
    }

    async fn write_frame(&self, frame: &Frame) -> HubResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame.encode()).await?;
        Ok(())
    }

    async fn close(&self) -> HubResult<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// In-process connection (同进程通信, 测试)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Frame>>>,
    tx: Arc<std::sync::Mutex<Option<mpsc::UnboundedSender<Frame>>>>,
}

impl MemoryTransport {
    /// Two connected ends: frames written to one are read from the other
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::new(a_rx, b_tx), Self::new(b_rx, a_tx))
    }

    fn new(rx: mpsc::UnboundedReceiver<Frame>, tx: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
            tx: Arc::new(std::sync::Mutex::new(Some(tx))),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_frame(&self) -> HubResult<Frame> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(HubError::Closed)
    }

    async fn write_frame(&self, frame: &Frame) -> HubResult<()> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone();
        tx.ok_or(HubError::Closed)?
            .send(frame.clone())
            .map_err(|_| HubError::Closed)
    }

    async fn close(&self) -> HubResult<()> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
