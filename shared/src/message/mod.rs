//! 同步通道消息类型定义
//!
//! 这些类型在 quire-hub 和 clients 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。
//!
//! # Frame layout
//!
//! ```text
//! ┌──────┬────────────────┬─────────────┬──────────────┐
//! │ kind │  request_id    │ payload_len │   payload    │
//! │  u8  │   16 bytes     │   u32 LE    │  JSON bytes  │
//! └──────┴────────────────┴─────────────┴──────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod event;
pub mod payload;
pub use event::*;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// Header size: kind (1) + request id (16) + payload length (4)
pub const FRAME_HEADER_LEN: usize = 21;

/// Upper bound on a single payload; larger frames are a protocol error
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    /// 握手消息 (client -> hub)
    Handshake = 0,
    /// 加入房间 (client -> hub)
    Join = 1,
    /// 离开房间 (client -> hub)
    Leave = 2,
    /// 房间事件 (双向: publisher -> hub -> subscribers)
    Event = 3,
    /// 请求响应
    Response = 4,
    /// 心跳
    Ping = 5,
}

impl TryFrom<u8> for FrameKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameKind::Handshake),
            1 => Ok(FrameKind::Join),
            2 => Ok(FrameKind::Leave),
            3 => Ok(FrameKind::Event),
            4 => Ok(FrameKind::Response),
            5 => Ok(FrameKind::Ping),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Handshake => write!(f, "handshake"),
            FrameKind::Join => write!(f, "join"),
            FrameKind::Leave => write!(f, "leave"),
            FrameKind::Event => write!(f, "event"),
            FrameKind::Response => write!(f, "response"),
            FrameKind::Ping => write!(f, "ping"),
        }
    }
}

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("unknown frame kind: {0}")]
    UnknownKind(u8),
    #[error("frame too short: {0} bytes")]
    Truncated(usize),
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// 通道帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub request_id: Uuid,
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            kind,
            payload,
        }
    }

    /// 序列化载荷并创建帧
    pub fn with_payload<T: Serialize>(kind: FrameKind, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_vec(payload)?))
    }

    /// 创建握手帧
    pub fn handshake(payload: &HandshakePayload) -> Result<Self, serde_json::Error> {
        Self::with_payload(FrameKind::Handshake, payload)
    }

    /// 创建加入房间帧
    pub fn join(room: &str) -> Result<Self, serde_json::Error> {
        Self::with_payload(FrameKind::Join, &RoomPayload::new(room))
    }

    /// 创建离开房间帧
    pub fn leave(room: &str) -> Result<Self, serde_json::Error> {
        Self::with_payload(FrameKind::Leave, &RoomPayload::new(room))
    }

    /// 创建房间事件帧
    pub fn event(room: &str, event: &ChannelEvent) -> Result<Self, serde_json::Error> {
        Self::with_payload(
            FrameKind::Event,
            &EventPayload {
                room: room.to_string(),
                event: event.clone(),
            },
        )
    }

    /// 创建响应帧 (request_id 沿用请求帧)
    pub fn response(request_id: Uuid, payload: &ResponsePayload) -> Result<Self, serde_json::Error> {
        let mut frame = Self::with_payload(FrameKind::Response, payload)?;
        frame.request_id = request_id;
        Ok(frame)
    }

    /// 创建心跳帧
    pub fn ping() -> Self {
        Self::new(FrameKind::Ping, Vec::new())
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Encode header + payload into one buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        data.push(self.kind as u8);
        data.extend_from_slice(self.request_id.as_bytes());
        data.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.payload);
        data
    }

    /// Parse a fixed-size header into (kind, request_id, payload_len)
    pub fn decode_header(header: &[u8; FRAME_HEADER_LEN]) -> Result<(FrameKind, Uuid, usize), FrameError> {
        let kind = FrameKind::try_from(header[0]).map_err(|_| FrameError::UnknownKind(header[0]))?;

        let mut uuid_buf = [0u8; 16];
        uuid_buf.copy_from_slice(&header[1..17]);
        let request_id = Uuid::from_bytes(uuid_buf);

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&header[17..21]);
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_PAYLOAD_LEN {
            return Err(FrameError::TooLarge(len));
        }

        Ok((kind, request_id, len))
    }

    /// Decode a complete frame from a buffer
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let header: &[u8; FRAME_HEADER_LEN] = bytes
            .get(..FRAME_HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(FrameError::Truncated(bytes.len()))?;
        let (kind, request_id, len) = Self::decode_header(header)?;

        let payload = bytes
            .get(FRAME_HEADER_LEN..FRAME_HEADER_LEN + len)
            .ok_or(FrameError::Truncated(bytes.len()))?
            .to_vec();

        Ok(Self {
            request_id,
            kind,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_frame() {
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some("test-client".to_string()),
            client_version: Some("0.1.0".to_string()),
        };

        let frame = Frame::handshake(&payload).unwrap();
        assert_eq!(frame.kind, FrameKind::Handshake);
        assert!(!frame.request_id.is_nil());

        let parsed: HandshakePayload = frame.parse_payload().unwrap();
        assert_eq!(parsed.version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_encode_decode() {
        let frame = Frame::join("store-1").unwrap();
        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + frame.payload.len());

        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
        let room: RoomPayload = decoded.parse_payload().unwrap();
        assert_eq!(room.tenant_id, "store-1");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(Frame::decode(&[3, 0, 0]), Err(FrameError::Truncated(3))));

        let mut bytes = Frame::ping().encode();
        bytes[0] = 42;
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::UnknownKind(42))));

        let mut bytes = Frame::ping().encode();
        bytes[17..21].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::TooLarge(_))));
    }

    #[test]
    fn test_response_keeps_request_id() {
        let join = Frame::join("store-1").unwrap();
        let resp = Frame::response(join.request_id, &ResponsePayload::ok("joined")).unwrap();
        assert_eq!(resp.request_id, join.request_id);
        assert_eq!(resp.kind, FrameKind::Response);
    }
}
