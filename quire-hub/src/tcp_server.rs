//! TCP 服务器实现
//!
//! 负责处理客户端连接，包括：
//! - 监听连接
//! - 协议握手验证
//! - 房间加入/离开
//! - 事件发布与转发

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use shared::message::{EventPayload, HandshakePayload, PROTOCOL_VERSION, ResponsePayload, RoomPayload};
use shared::{ChannelEvent, Frame, FrameKind};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::{ConnectedClient, RoomBus};
use crate::error::{HubError, HubResult};
use crate::transport::{MemoryTransport, TcpTransport, Transport};

/// Delay before closing connection after sending error (allows client to receive the message)
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

impl RoomBus {
    /// Bind the configured listen address
    pub async fn bind(&self) -> HubResult<TcpListener> {
        let addr = &self.config.listen_addr;
        let listener = TcpListener::bind(addr).await.map_err(|source| HubError::Bind {
            addr: addr.clone(),
            source,
        })?;

        match listener.local_addr() {
            Ok(local) => tracing::info!("Room hub listening on {}", local),
            Err(_) => tracing::info!("Room hub listening on {}", addr),
        }
        Ok(listener)
    }

    /// Bind and serve until [`RoomBus::shutdown`]
    pub async fn run(&self) -> HubResult<()> {
        let listener = self.bind().await?;
        self.accept_loop(listener).await;
        Ok(())
    }

    /// Main accept loop
    pub async fn accept_loop(&self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Room hub TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }

    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));
        self.serve_transport(transport, addr.to_string());
    }

    /// Run a client session over any transport
    pub fn serve_transport(&self, transport: Arc<dyn Transport>, peer: impl Into<String>) -> JoinHandle<()> {
        let bus = self.clone();
        let peer = peer.into();
        tokio::spawn(async move {
            if let Err(e) = handle_client_connection(bus, transport, &peer).await {
                tracing::debug!("Client {} handler finished: {}", peer, e);
            }
        })
    }

    /// 获取内存客户端连接 (同进程通信)
    ///
    /// The returned end behaves like a TCP client connection: it must
    /// handshake before joining rooms.
    pub fn memory_client(&self) -> MemoryTransport {
        let (client, hub) = MemoryTransport::pair();
        self.serve_transport(Arc::new(hub), "memory");
        client
    }
}

/// Handle a single client connection
async fn handle_client_connection(bus: RoomBus, transport: Arc<dyn Transport>, peer: &str) -> HubResult<()> {
    let handshake = tokio::time::timeout(bus.config.handshake_timeout, perform_handshake(&transport, peer))
        .await
        .map_err(|_| HubError::Timeout(format!("handshake from {}", peer)))
        .and_then(|result| result);
    let client = match handshake {
        Ok(client) => client,
        Err(e) => {
            if let Err(close_err) = transport.close().await {
                tracing::debug!("Transport close failed for {}: {}", peer, close_err);
            }
            return Err(e);
        }
    };

    bus.clients.insert(client.id.clone(), ConnectedClient {
        id: client.id.clone(),
        name: client.name,
        peer: peer.to_string(),
    });
    tracing::debug!(client_id = %client.id, "Client registered");

    let mut session = ClientSession {
        disconnect_token: bus.shutdown_token().child_token(),
        bus: bus.clone(),
        transport: transport.clone(),
        client_id: client.id.clone(),
        forwarders: HashMap::new(),
    };
    session.read_client_frames().await;
    session.disconnect();

    if let Err(e) = transport.close().await {
        tracing::debug!(client_id = %client.id, "Transport close failed: {}", e);
    }
    bus.clients.remove(&client.id);
    tracing::debug!(client_id = %client.id, "Client removed from registry");

    Ok(())
}

struct Handshake {
    id: String,
    name: Option<String>,
}

/// Perform protocol handshake with client
async fn perform_handshake(transport: &Arc<dyn Transport>, peer: &str) -> HubResult<Handshake> {
    tracing::debug!("Waiting for handshake from {}", peer);

    let frame = transport.read_frame().await.map_err(|e| {
        tracing::warn!("Client {} handshake error: {}", peer, e);
        e
    })?;

    if frame.kind != FrameKind::Handshake {
        tracing::warn!("Client {} failed to handshake: expected handshake, got {}", peer, frame.kind);
        send_handshake_error(transport, &frame, "Expected handshake").await;
        return Err(HubError::Handshake(format!("expected handshake, got {}", frame.kind)));
    }

    let payload: HandshakePayload = match frame.parse_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Client {} sent invalid handshake payload: {}", peer, e);
            send_handshake_error(transport, &frame, &format!("Invalid handshake payload: {}", e)).await;
            return Err(e.into());
        }
    };

    // Version check
    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Client {} protocol version mismatch: expected {}, got {}",
            peer,
            PROTOCOL_VERSION,
            payload.version
        );
        send_handshake_error(
            transport,
            &frame,
            &format!(
                "Protocol version mismatch: hub={}, client={}. Please update your client.",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;
        return Err(HubError::Handshake("protocol version mismatch".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    tracing::debug!(
        "Client {} handshake success (v{}, client: {:?}, id: {})",
        peer,
        payload.version,
        payload.client_name,
        id
    );

    let response = Frame::response(frame.request_id, &ResponsePayload::ok(format!("Connected as client: {}", id)))?;
    transport.write_frame(&response).await?;

    Ok(Handshake {
        id,
        name: payload.client_name,
    })
}

async fn send_handshake_error(transport: &Arc<dyn Transport>, request: &Frame, message: &str) {
    match Frame::response(request.request_id, &ResponsePayload::error(message)) {
        Ok(response) => {
            if let Err(e) = transport.write_frame(&response).await {
                tracing::error!("Failed to send handshake error: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to encode handshake error: {}", e),
    }

    // Give client some time to receive the message before closing
    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// One handshaken client and its joined rooms
struct ClientSession {
    bus: RoomBus,
    transport: Arc<dyn Transport>,
    client_id: String,
    /// room -> forwarder stop token
    forwarders: HashMap<String, CancellationToken>,
    disconnect_token: CancellationToken,
}

impl ClientSession {
    async fn read_client_frames(&mut self) {
        loop {
            let frame = tokio::select! {
                _ = self.disconnect_token.cancelled() => break,

                read_result = self.transport.read_frame() => match read_result {
                    Ok(frame) => frame,
                    Err(HubError::Closed) => {
                        tracing::debug!(client_id = %self.client_id, "Client disconnected");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(client_id = %self.client_id, "Client read failed: {}", e);
                        break;
                    }
                },
            };

            if let Err(e) = self.handle_frame(frame).await {
                tracing::debug!(client_id = %self.client_id, "Client write failed: {}", e);
                break;
            }
        }
    }

    /// Errors returned here end the session; bad requests are answered instead
    async fn handle_frame(&mut self, frame: Frame) -> HubResult<()> {
        let reply = match frame.kind {
            FrameKind::Join => match frame.parse_payload::<RoomPayload>() {
                Ok(room) => {
                    self.join(room.tenant_id.clone());
                    ResponsePayload::ok(format!("Joined {}", room.tenant_id))
                }
                Err(e) => ResponsePayload::error(format!("Invalid join payload: {}", e)),
            },
            FrameKind::Leave => match frame.parse_payload::<RoomPayload>() {
                Ok(room) => {
                    self.leave(&room.tenant_id);
                    ResponsePayload::ok(format!("Left {}", room.tenant_id))
                }
                Err(e) => ResponsePayload::error(format!("Invalid leave payload: {}", e)),
            },
            FrameKind::Event => match frame.parse_payload::<EventPayload>() {
                Ok(EventPayload { room, event }) => {
                    tracing::debug!(client_id = %self.client_id, room = %room, event = %event.kind(), "Event from publisher");
                    let delivered = self.bus.publish(&room, event);
                    ResponsePayload::ok(format!("Delivered to {}", delivered))
                }
                Err(e) => ResponsePayload::error(format!("Invalid event payload: {}", e)),
            },
            FrameKind::Ping => {
                tracing::trace!(client_id = %self.client_id, "Ping");
                return Ok(());
            }
            FrameKind::Handshake | FrameKind::Response => {
                ResponsePayload::error(format!("Unexpected {} frame", frame.kind))
            }
        };

        if !reply.success {
            tracing::warn!(client_id = %self.client_id, kind = %frame.kind, "{}", reply.message);
        }
        let response = Frame::response(frame.request_id, &reply)?;
        self.transport.write_frame(&response).await
    }

    /// Joining a room twice keeps the single existing forwarder
    fn join(&mut self, room: String) {
        if self.forwarders.contains_key(&room) {
            return;
        }
        let stop = self.disconnect_token.child_token();
        spawn_room_forwarder(
            self.bus.clone(),
            self.transport.clone(),
            self.bus.subscribe(&room),
            room.clone(),
            self.client_id.clone(),
            stop.clone(),
        );
        tracing::debug!(client_id = %self.client_id, room = %room, "Joined room");
        self.forwarders.insert(room, stop);
    }

    fn leave(&mut self, room: &str) {
        if let Some(stop) = self.forwarders.remove(room) {
            stop.cancel();
            tracing::debug!(client_id = %self.client_id, room = %room, "Left room");
        }
    }

    fn disconnect(&mut self) {
        self.disconnect_token.cancel();
        self.forwarders.clear();
    }
}

/// Spawn task to forward room events to one client
fn spawn_room_forwarder(
    bus: RoomBus,
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<ChannelEvent>,
    room: String,
    client_id: String,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = stop.cancelled() => break,

                recv = rx.recv() => match recv {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Missed events cannot be replayed; ask the client to refetch
                        tracing::warn!(
                            client_id = %client_id,
                            room = %room,
                            dropped_events = n,
                            "Client lagged behind, sending ordersInvalidated"
                        );
                        ChannelEvent::OrdersInvalidated
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            let frame = match Frame::event(&room, &event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(room = %room, "Failed to encode event: {}", e);
                    continue;
                }
            };
            if let Err(e) = transport.write_frame(&frame).await {
                tracing::debug!(client_id = %client_id, "Client write failed: {}", e);
                break;
            }
        }

        drop(rx);
        bus.release(&room);
        tracing::debug!(client_id = %client_id, room = %room, "Room forwarder stopped");
    })
}
