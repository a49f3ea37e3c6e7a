//! SyncChannel - room-scoped event channel with automatic reconnect
//!
//! A single background worker owns the connection:
//! 1. Connect + handshake (bounded by `handshake_timeout`)
//! 2. Replay every joined room
//! 3. Dispatch `Event` frames to handlers and notice subscribers
//! 4. On loss: wait `reconnect_delay`, retry; after `retries_before_unavailable`
//!    failed retries report `Unavailable` and keep retrying at the same delay
//!
//! Events are not buffered across reconnects. Every connect after the first
//! is announced as `Connected { resumed: true }` so consumers can resync.

use shared::message::{EventPayload, HandshakePayload, PROTOCOL_VERSION, ResponsePayload};
use shared::{ChannelEvent, EventKind, Frame, FrameKind};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::transport::{Connector, Transport};
use super::{ChannelConfig, ChannelError, ChannelNotice, ConnectionState};

type Handler = Arc<dyn Fn(&str, &ChannelEvent) + Send + Sync>;

/// Inbound frames buffered between the reader task and the worker
const INBOUND_BUFFER: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Command {
    Join(String),
    Leave(String),
}

/// State shared between handles and the worker
#[derive(Default)]
struct Shared {
    /// Desired rooms, replayed on every connect
    rooms: Mutex<BTreeSet<String>>,
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
    last_error: Mutex<Option<ChannelError>>,
}

struct Handle {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    notices: broadcast::Sender<ChannelNotice>,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Sync channel handle
///
/// Cheap to clone. Dropping the last clone stops the worker, as does
/// [`SyncChannel::shutdown`].
#[derive(Clone)]
pub struct SyncChannel {
    inner: Arc<Handle>,
}

impl fmt::Debug for SyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncChannel")
            .field("state", &self.state())
            .field("rooms", &self.rooms())
            .finish_non_exhaustive()
    }
}

impl SyncChannel {
    /// Spawn the channel worker. Returns immediately; the first connection
    /// attempt starts in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<C: Connector>(config: ChannelConfig, connector: C) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let shutdown = CancellationToken::new();
        let shared = Arc::new(Shared::default());

        let worker = ChannelWorker {
            config,
            connector: Box::new(connector),
            shared: shared.clone(),
            commands: commands_rx,
            notices: notices.clone(),
            state: state_tx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(worker.run());

        Self {
            inner: Arc::new(Handle {
                shared,
                commands: commands_tx,
                notices,
                state: state_rx,
                shutdown,
            }),
        }
    }

    /// Join a room (tenant / store id). Idempotent.
    pub fn join(&self, room: impl Into<String>) {
        let room = room.into();
        if lock(&self.inner.shared.rooms).insert(room.clone()) {
            tracing::debug!(room = %room, "Joining room");
            self.send(Command::Join(room));
        }
    }

    /// Leave a room. Idempotent.
    pub fn leave(&self, room: &str) {
        if lock(&self.inner.shared.rooms).remove(room) {
            tracing::debug!(room, "Leaving room");
            self.send(Command::Leave(room.to_string()));
        }
    }

    fn send(&self, command: Command) {
        // Worker gone (shut down); the room set is still updated
        if self.inner.commands.send(command).is_err() {
            tracing::debug!("Sync channel worker stopped, command dropped");
        }
    }

    /// Joined rooms, sorted
    pub fn rooms(&self) -> Vec<String> {
        lock(&self.inner.shared.rooms).iter().cloned().collect()
    }

    /// Register a callback for one event kind
    ///
    /// Callbacks run on the worker task; keep them short.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&str, &ChannelEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.shared.handlers)
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Receive every notice (connection changes and events)
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelNotice> {
        self.inner.notices.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Most recent connection error, cleared on successful connect
    pub fn last_error(&self) -> Option<ChannelError> {
        lock(&self.inner.shared.last_error).clone()
    }

    /// Stop the worker, including any pending reconnect timer
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

enum SessionEnd {
    Shutdown,
    Lost(ChannelError),
}

struct ChannelWorker {
    config: ChannelConfig,
    connector: Box<dyn Connector>,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    notices: broadcast::Sender<ChannelNotice>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl ChannelWorker {
    async fn run(mut self) {
        tracing::info!(client = %self.config.client_name, "Sync channel worker started");

        // Failures since the last successful connect (a lost session counts as one)
        let mut failures: u32 = 0;
        let mut unavailable_reported = false;
        let mut ever_connected = false;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.open() => result,
            };

            match attempt {
                Ok(transport) => {
                    failures = 0;
                    unavailable_reported = false;
                    *lock(&self.shared.last_error) = None;
                    self.state.send_replace(ConnectionState::Connected);
                    tracing::info!(resumed = ever_connected, "Sync channel connected");
                    self.notify(ChannelNotice::Connected {
                        resumed: ever_connected,
                    });
                    ever_connected = true;

                    let end = self.run_session(transport.clone()).await;
                    if let Err(e) = transport.close().await {
                        tracing::debug!("Transport close failed: {}", e);
                    }
                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(error) => {
                            tracing::warn!(error = %error, "Sync channel connection lost");
                            *lock(&self.shared.last_error) = Some(error);
                            self.state.send_replace(ConnectionState::Reconnecting);
                            self.notify(ChannelNotice::Disconnected);
                            failures = 1;
                        }
                    }
                }
                Err(error) => {
                    failures = failures.saturating_add(1);
                    self.state.send_replace(ConnectionState::Reconnecting);
                    tracing::warn!(attempt = failures, error = %error, "Sync channel connect failed");

                    if failures > self.config.retries_before_unavailable {
                        let error = ChannelError::Unavailable {
                            attempts: failures,
                            reason: error.to_string(),
                        };
                        *lock(&self.shared.last_error) = Some(error.clone());
                        if !unavailable_reported {
                            unavailable_reported = true;
                            tracing::error!(
                                retry_secs = self.config.reconnect_delay.as_secs_f64(),
                                "Sync channel unavailable, retrying in degraded mode"
                            );
                            self.notify(ChannelNotice::Unavailable { error });
                        }
                    } else {
                        *lock(&self.shared.last_error) = Some(error);
                    }
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
        tracing::info!("Sync channel worker stopped");
    }

    fn notify(&self, notice: ChannelNotice) {
        if self.notices.send(notice).is_err() {
            tracing::trace!("No notice subscribers");
        }
    }

    /// Connect and complete the handshake
    async fn open(&self) -> Result<Arc<dyn Transport>, ChannelError> {
        let timeout = self.config.handshake_timeout;

        let transport = tokio::time::timeout(timeout, self.connector.connect())
            .await
            .map_err(|_| ChannelError::Timeout("connect".to_string()))??;

        let hello = Frame::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some(self.config.client_name.clone()),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        })?;
        transport.write_frame(&hello).await?;

        let reply = tokio::time::timeout(timeout, transport.read_frame())
            .await
            .map_err(|_| ChannelError::Timeout("handshake".to_string()))??;
        if reply.kind != FrameKind::Response {
            return Err(ChannelError::Protocol(format!(
                "expected handshake response, got {}",
                reply.kind
            )));
        }
        let response: ResponsePayload = reply.parse_payload()?;
        if !response.success {
            return Err(ChannelError::Handshake(response.message));
        }

        Ok(transport)
    }

    /// Run one connected session until it is lost or the channel shuts down
    async fn run_session(&mut self, transport: Arc<dyn Transport>) -> SessionEnd {
        // Queued commands predate this connection; the room set is authoritative
        while self.commands.try_recv().is_ok() {}
        let rooms: Vec<String> = lock(&self.shared.rooms).iter().cloned().collect();
        for room in &rooms {
            if let Err(e) = write_room_frame(transport.as_ref(), FrameKind::Join, room).await {
                return SessionEnd::Lost(e);
            }
        }
        if !rooms.is_empty() {
            tracing::debug!(rooms = rooms.len(), "Rooms replayed");
        }

        // Reads are not cancel-safe, so they run on their own task
        let (inbound_tx, mut inbound) = mpsc::channel(INBOUND_BUFFER);
        let reader = {
            let transport = transport.clone();
            tokio::spawn(async move {
                loop {
                    let result = transport.read_frame().await;
                    let failed = result.is_err();
                    if inbound_tx.send(result).await.is_err() || failed {
                        break;
                    }
                }
            })
        };

        let heartbeat_enabled = !self.config.heartbeat_interval.is_zero();
        let period = if heartbeat_enabled {
            self.config.heartbeat_interval
        } else {
            Duration::from_secs(3600)
        };
        let mut heartbeat = tokio::time::interval(period);
        heartbeat.tick().await; // skip immediate tick

        let end = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break SessionEnd::Shutdown,

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break SessionEnd::Shutdown;
                    };
                    let result = match &command {
                        Command::Join(room) => write_room_frame(transport.as_ref(), FrameKind::Join, room).await,
                        Command::Leave(room) => write_room_frame(transport.as_ref(), FrameKind::Leave, room).await,
                    };
                    if let Err(e) = result {
                        break SessionEnd::Lost(e);
                    }
                }

                frame = inbound.recv() => match frame {
                    Some(Ok(frame)) => self.handle_frame(frame),
                    Some(Err(e)) => break SessionEnd::Lost(e),
                    None => break SessionEnd::Lost(ChannelError::Closed),
                },

                _ = heartbeat.tick(), if heartbeat_enabled => {
                    if let Err(e) = transport.write_frame(&Frame::ping()).await {
                        break SessionEnd::Lost(e);
                    }
                }
            }
        };

        reader.abort();
        end
    }

    fn handle_frame(&self, frame: Frame) {
        match frame.kind {
            FrameKind::Event => match frame.parse_payload::<EventPayload>() {
                Ok(EventPayload { room, event }) => self.dispatch(room, event),
                Err(e) => tracing::warn!("Malformed event payload, dropped: {}", e),
            },
            FrameKind::Response => match frame.parse_payload::<ResponsePayload>() {
                Ok(response) if !response.success => {
                    tracing::warn!(request_id = %frame.request_id, message = %response.message, "Hub rejected request");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Malformed response payload: {}", e),
            },
            FrameKind::Ping => tracing::trace!("Hub ping"),
            other => tracing::debug!(kind = %other, "Unexpected frame from hub, ignored"),
        }
    }

    fn dispatch(&self, room: String, event: ChannelEvent) {
        if !lock(&self.shared.rooms).contains(&room) {
            tracing::debug!(room = %room, "Event for a room not joined, ignored");
            return;
        }

        let handlers: Vec<Handler> = lock(&self.shared.handlers)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler(&room, &event);
        }

        tracing::debug!(room = %room, event = %event.kind(), "Event received");
        self.notify(ChannelNotice::Event { room, event });
    }
}

async fn write_room_frame(transport: &dyn Transport, kind: FrameKind, room: &str) -> Result<(), ChannelError> {
    let frame = match kind {
        FrameKind::Leave => Frame::leave(room)?,
        _ => Frame::join(room)?,
    };
    transport.write_frame(&frame).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryConnector, MemoryTransport};
    use shared::Order;
    use shared::message::RoomPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> ChannelConfig {
        ChannelConfig::default()
            .with_reconnect_delay(Duration::from_millis(20))
            .with_heartbeat_interval(Duration::ZERO)
    }

    /// Answer the client handshake on the hub side
    async fn accept_handshake(peer: &MemoryTransport) {
        let hello = tokio::time::timeout(WAIT, peer.read_frame()).await.unwrap().unwrap();
        assert_eq!(hello.kind, FrameKind::Handshake);
        let payload: HandshakePayload = hello.parse_payload().unwrap();
        assert_eq!(payload.version, PROTOCOL_VERSION);
        let ok = Frame::response(hello.request_id, &ResponsePayload::ok("welcome")).unwrap();
        peer.write_frame(&ok).await.unwrap();
    }

    async fn expect_room_frame(peer: &MemoryTransport, kind: FrameKind) -> String {
        let frame = tokio::time::timeout(WAIT, peer.read_frame()).await.unwrap().unwrap();
        assert_eq!(frame.kind, kind);
        frame.parse_payload::<RoomPayload>().unwrap().tenant_id
    }

    async fn next_notice(rx: &mut broadcast::Receiver<ChannelNotice>) -> ChannelNotice {
        tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    fn order(id: &str) -> Order {
        Order::new(id, "s-1", "u-1", vec![], 10.0)
    }

    #[tokio::test]
    async fn test_connect_join_and_receive_event() {
        let connector = MemoryConnector::new();
        let peer = connector.accept_next();

        let channel = SyncChannel::connect(fast_config(), connector);
        let mut notices = channel.subscribe();
        let seen = Arc::new(AtomicUsize::new(0));
        {
            let seen = seen.clone();
            channel.on(EventKind::OrderUpdated, move |room, event| {
                assert_eq!(room, "s-1");
                assert_eq!(event.order_id(), Some("o-1"));
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }
        channel.join("s-1");
        channel.join("s-1");

        accept_handshake(&peer).await;
        assert_eq!(next_notice(&mut notices).await, ChannelNotice::Connected { resumed: false });
        assert!(channel.is_connected());
        assert_eq!(expect_room_frame(&peer, FrameKind::Join).await, "s-1");

        let event = ChannelEvent::OrderUpdated(order("o-1"));
        peer.write_frame(&Frame::event("s-1", &event).unwrap()).await.unwrap();
        assert_eq!(
            next_notice(&mut notices).await,
            ChannelNotice::Event {
                room: "s-1".into(),
                event
            }
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(channel.rooms(), vec!["s-1".to_string()]);
    }

    #[tokio::test]
    async fn test_events_for_other_rooms_are_ignored() {
        let connector = MemoryConnector::new();
        let peer = connector.accept_next();
        let channel = SyncChannel::connect(fast_config(), connector);
        let mut notices = channel.subscribe();
        channel.join("s-1");

        accept_handshake(&peer).await;
        next_notice(&mut notices).await;
        expect_room_frame(&peer, FrameKind::Join).await;

        let stray = ChannelEvent::OrderDeleted { order_id: "o-9".into() };
        peer.write_frame(&Frame::event("s-2", &stray).unwrap()).await.unwrap();
        let wanted = ChannelEvent::OrdersInvalidated;
        peer.write_frame(&Frame::event("s-1", &wanted).unwrap()).await.unwrap();

        assert_eq!(
            next_notice(&mut notices).await,
            ChannelNotice::Event {
                room: "s-1".into(),
                event: wanted
            }
        );
    }

    #[tokio::test]
    async fn test_leave_sends_frame_once() {
        let connector = MemoryConnector::new();
        let peer = connector.accept_next();
        let channel = SyncChannel::connect(fast_config(), connector);
        let mut notices = channel.subscribe();

        accept_handshake(&peer).await;
        next_notice(&mut notices).await;

        channel.join("s-3");
        assert_eq!(expect_room_frame(&peer, FrameKind::Join).await, "s-3");
        channel.leave("s-3");
        channel.leave("s-3");
        assert_eq!(expect_room_frame(&peer, FrameKind::Leave).await, "s-3");
        assert!(channel.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_handshake_counts_as_failure() {
        let connector = MemoryConnector::new();
        let peer = connector.accept_next();
        let channel = SyncChannel::connect(fast_config(), connector);
        let mut notices = channel.subscribe();

        let hello = tokio::time::timeout(WAIT, peer.read_frame()).await.unwrap().unwrap();
        let no = Frame::response(hello.request_id, &ResponsePayload::error("version mismatch")).unwrap();
        peer.write_frame(&no).await.unwrap();

        // first failure, then the single retry finds no peer
        match next_notice(&mut notices).await {
            ChannelNotice::Unavailable { error } => {
                assert_eq!(error.code(), shared::ErrorCode::ChannelUnavailable);
            }
            other => panic!("unexpected notice: {other:?}"),
        }
        assert!(!channel.is_connected());
        assert!(channel.last_error().is_some());
    }

    #[tokio::test]
    async fn test_reconnect_rejoins_and_reports_resumed() {
        let connector = MemoryConnector::new();
        let first = connector.accept_next();
        let channel = SyncChannel::connect(fast_config(), connector.clone());
        let mut notices = channel.subscribe();
        channel.join("s-1");

        accept_handshake(&first).await;
        assert_eq!(next_notice(&mut notices).await, ChannelNotice::Connected { resumed: false });
        expect_room_frame(&first, FrameKind::Join).await;

        // hub goes away; the one retry fails too
        drop(first);
        assert_eq!(next_notice(&mut notices).await, ChannelNotice::Disconnected);
        assert!(matches!(
            next_notice(&mut notices).await,
            ChannelNotice::Unavailable { .. }
        ));
        assert_eq!(channel.state(), ConnectionState::Reconnecting);

        // hub is back
        let second = connector.accept_next();
        accept_handshake(&second).await;
        assert_eq!(next_notice(&mut notices).await, ChannelNotice::Connected { resumed: true });
        assert_eq!(expect_room_frame(&second, FrameKind::Join).await, "s-1");
        assert!(channel.last_error().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let connector = MemoryConnector::new();
        let channel = SyncChannel::connect(
            fast_config().with_reconnect_delay(Duration::from_secs(60)),
            connector,
        );
        let mut state = channel.watch_state();

        // first attempt fails, worker parks on the 60s reconnect timer
        state
            .wait_for(|s| *s == ConnectionState::Reconnecting)
            .await
            .unwrap();
        channel.shutdown();
        tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Disconnected))
            .await
            .unwrap()
            .unwrap();
    }
}
