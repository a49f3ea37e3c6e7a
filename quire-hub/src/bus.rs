//! 房间总线
//!
//! # 架构
//!
//! ```text
//! publisher ──▶ Event frame ──▶ RoomBus::publish(room)
//!                                     │
//!                     rooms: DashMap<room, broadcast::Sender>
//!                                     │
//!                  ┌──────────────────┼──────────────────┐
//!                  ▼                  ▼                  ▼
//!             forwarder          forwarder          forwarder
//!          (client A, s-1)    (client B, s-1)    (client C, s-1)
//! ```
//!
//! Each joined room of each client has its own forwarder task holding a
//! broadcast receiver. A room's sender is created on first join and dropped
//! once its last receiver is gone.

use std::sync::Arc;

use dashmap::DashMap;
use shared::ChannelEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;

/// 已连接客户端信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedClient {
    pub id: String,
    /// Name announced in the handshake
    pub name: Option<String>,
    /// Socket address, or `memory` for in-process clients
    pub peer: String,
}

/// 房间总线 - 负责房间订阅和事件转发
#[derive(Debug, Clone)]
pub struct RoomBus {
    rooms: Arc<DashMap<String, broadcast::Sender<ChannelEvent>>>,
    pub(crate) clients: Arc<DashMap<String, ConnectedClient>>,
    pub(crate) config: HubConfig,
    shutdown_token: CancellationToken,
}

impl RoomBus {
    pub fn new() -> Self {
        Self::from_config(HubConfig::default())
    }

    pub fn from_config(config: HubConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            clients: Arc::new(DashMap::new()),
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// 订阅房间 (房间不存在时创建)
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<ChannelEvent> {
        let capacity = self.config.channel_capacity;
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| {
                tracing::debug!(room = %room, "Room opened");
                broadcast::channel(capacity).0
            })
            .subscribe()
    }

    /// 发布事件到房间
    ///
    /// Returns the number of subscribers the event reached; a room nobody
    /// joined silently drops it.
    pub fn publish(&self, room: &str, event: ChannelEvent) -> usize {
        let Some(tx) = self.rooms.get(room) else {
            tracing::debug!(room = %room, event = %event.kind(), "No subscribers, event dropped");
            return 0;
        };
        let delivered = tx.send(event).unwrap_or(0);
        tracing::debug!(room = %room, delivered, "Event published");
        delivered
    }

    /// Drop the room once no receiver is left
    pub(crate) fn release(&self, room: &str) {
        if self
            .rooms
            .remove_if(room, |_, tx| tx.receiver_count() == 0)
            .is_some()
        {
            tracing::debug!(room = %room, "Room closed");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn subscriber_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|tx| tx.receiver_count()).unwrap_or(0)
    }

    /// 获取已连接客户端列表
    pub fn connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients.iter().map(|entry| entry.value().clone()).collect()
    }

    /// 获取关闭令牌
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭
    ///
    /// 停止 accept 循环和所有客户端会话
    pub fn shutdown(&self) {
        tracing::info!("Shutting down room bus");
        self.shutdown_token.cancel();
    }
}

impl Default for RoomBus {
    fn default() -> Self {
        Self::new()
    }
}
