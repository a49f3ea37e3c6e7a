use async_trait::async_trait;
use shared::message::{FRAME_HEADER_LEN, Frame};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};

use super::ChannelError;

/// Transport abstraction for the sync channel
///
/// Reads and writes may run concurrently from different tasks.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_frame(&self) -> Result<Frame, ChannelError>;
    async fn write_frame(&self, frame: &Frame) -> Result<(), ChannelError>;
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens a fresh transport for every (re)connect attempt
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn Transport>, ChannelError>;
}

/// TCP Transport Implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ChannelError::Connection(format!("{}: {}", addr, e)))?;
        Ok(Self::from_stream(stream))
    }

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
    async fn read_frame(&self) -> Result<Frame, ChannelError> {
        let mut reader = self.reader.lock().await;

        // kind (1) + request id (16) + payload length (4)
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

    async fn write_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame.encode()).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Memory Transport Implementation (for in-process communication and tests)
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

    fn sender(&self) -> Option<mpsc::UnboundedSender<Frame>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_frame(&self) -> Result<Frame, ChannelError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(ChannelError::Closed)
    }

    async fn write_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        self.sender()
            .ok_or(ChannelError::Closed)?
            .send(frame.clone())
            .map_err(|_| ChannelError::Closed)
    }

    /// Drops the sending half; the peer's next read reports `Closed`
    async fn close(&self) -> Result<(), ChannelError> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Connects over TCP to a hub address
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>, ChannelError> {
        let transport = TcpTransport::connect(&self.addr).await?;
        Ok(Arc::new(transport))
    }
}

/// Hands out queued in-memory transports, one per connect attempt
///
/// An empty queue (or a queued error) makes the attempt fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    queue: Arc<std::sync::Mutex<VecDeque<Result<MemoryTransport, ChannelError>>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection; returns the peer end
    pub fn accept_next(&self) -> MemoryTransport {
        let (client, peer) = MemoryTransport::pair();
        self.push(Ok(client));
        peer
    }

    /// Queue a failed attempt
    pub fn refuse_next(&self, error: ChannelError) {
        self.push(Err(error));
    }

    fn push(&self, outcome: Result<MemoryTransport, ChannelError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>, ChannelError> {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(transport)) => Ok(Arc::new(transport)),
            Some(Err(e)) => Err(e),
            None => Err(ChannelError::Connection("no peer listening".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FrameKind;

    #[tokio::test]
    async fn test_memory_pair_round_trip() {
        let (a, b) = MemoryTransport::pair();
        let frame = Frame::join("store-1").unwrap();
        a.write_frame(&frame).await.unwrap();
        assert_eq!(b.read_frame().await.unwrap(), frame);

        b.write_frame(&Frame::ping()).await.unwrap();
        assert_eq!(a.read_frame().await.unwrap().kind, FrameKind::Ping);
    }

    #[tokio::test]
    async fn test_memory_close_ends_peer_reads() {
        let (a, b) = MemoryTransport::pair();
        a.close().await.unwrap();
        assert_eq!(b.read_frame().await, Err(ChannelError::Closed));
        assert_eq!(a.write_frame(&Frame::ping()).await, Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let transport = TcpTransport::from_stream(stream);
            let frame = transport.read_frame().await.unwrap();
            transport.write_frame(&frame).await.unwrap();
        });

        let client = TcpConnector::new(addr).connect().await.unwrap();
        let frame = Frame::leave("store-7").unwrap();
        client.write_frame(&frame).await.unwrap();
        assert_eq!(client.read_frame().await.unwrap(), frame);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_connector_queue() {
        let connector = MemoryConnector::new();
        assert!(connector.connect().await.is_err());

        connector.refuse_next(ChannelError::Connection("refused".into()));
        let _peer = connector.accept_next();
        assert_eq!(
            connector.connect().await.unwrap_err(),
            ChannelError::Connection("refused".into())
        );
        assert!(connector.connect().await.is_ok());
    }
}
