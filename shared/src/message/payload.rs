use serde::{Deserialize, Serialize};

use super::event::ChannelEvent;

/// 握手载荷 (客户端 -> hub)
///
/// 包含客户端的协议版本信息，用于 hub 进行版本校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识
    pub client_name: Option<String>,
    /// 客户端版本
    pub client_version: Option<String>,
}

/// 加入/离开房间载荷 (房间按门店/租户划分)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub tenant_id: String,
}

impl RoomPayload {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

/// 房间事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub room: String,
    pub event: ChannelEvent,
}

/// 响应载荷 (hub -> 客户端)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub success: bool,
    pub message: String,
}

impl ResponsePayload {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
