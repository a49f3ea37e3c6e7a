// quire-client/src/channel/mod.rs
// 同步通道 - 配置、错误类型和通知

mod state;
mod sync;
mod transport;

pub use state::ConnectionState;
pub use sync::SyncChannel;
pub use transport::{Connector, MemoryConnector, MemoryTransport, TcpConnector, TcpTransport, Transport};

use shared::{AppError, ChannelEvent, ErrorCode, FrameError};
use std::time::Duration;
use thiserror::Error;

/// 同步通道配置
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// 重连间隔 (固定, 不做指数退避)
    pub reconnect_delay: Duration,
    /// 失败后的重试次数, 超过后上报 ChannelUnavailable (之后仍按固定间隔重试)
    pub retries_before_unavailable: u32,
    /// 握手超时
    pub handshake_timeout: Duration,
    /// 心跳间隔 (0 表示禁用)
    pub heartbeat_interval: Duration,
    /// 通知广播容量
    pub notice_capacity: usize,
    /// 握手时上报的客户端名称
    pub client_name: String,
}

impl Default for ChannelConfig {
    /// 局域网配置
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            retries_before_unavailable: 1,
            handshake_timeout: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(5),
            notice_capacity: 256,
            client_name: "quire-client".to_string(),
        }
    }
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 局域网配置 (默认)
    pub fn lan() -> Self {
        Self::default()
    }

    /// 广域网配置: 容忍高延迟, 减少心跳开销
    pub fn wan() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// 设置重连间隔
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// 设置上报不可用前的重试次数
    pub fn with_retries_before_unavailable(mut self, retries: u32) -> Self {
        self.retries_before_unavailable = retries;
        self
    }

    /// 设置握手超时
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// 设置心跳间隔 (0 表示禁用)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }
}

/// 通道错误
///
/// Cloneable so it can be stored as `last_error` and broadcast in notices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Handshake rejected: {0}")]
    Handshake(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Sync channel unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },
}

impl ChannelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Connection(_) | Self::Closed => ErrorCode::NetworkError,
            Self::Protocol(_) | Self::Handshake(_) => ErrorCode::ProtocolError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::Unavailable { .. } => ErrorCode::ChannelUnavailable,
        }
    }
}

impl From<FrameError> for ChannelError {
    fn from(err: FrameError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Connection(err.to_string()),
        }
    }
}

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

/// 通道通知 (通过 [`SyncChannel::subscribe`] 接收)
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelNotice {
    /// Connected. `resumed` is true for every connect after the first, meaning
    /// events may have been missed while disconnected.
    Connected { resumed: bool },
    /// An event for a joined room
    Event { room: String, event: ChannelEvent },
    /// Reconnect retries exhausted; the worker keeps trying in degraded mode
    Unavailable { error: ChannelError },
    /// An established connection was lost
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.retries_before_unavailable, 1);
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_config_presets() {
        let wan = ChannelConfig::wan();
        assert!(wan.heartbeat_interval > ChannelConfig::lan().heartbeat_interval);
        assert_eq!(wan.retries_before_unavailable, 1);

        let config = ChannelConfig::new()
            .with_reconnect_delay(Duration::from_millis(10))
            .with_heartbeat_interval(Duration::ZERO)
            .with_client_name("kiosk");
        assert_eq!(config.reconnect_delay, Duration::from_millis(10));
        assert!(config.heartbeat_interval.is_zero());
        assert_eq!(config.client_name, "kiosk");
    }

    #[test]
    fn test_error_codes() {
        let unavailable = ChannelError::Unavailable {
            attempts: 2,
            reason: "refused".into(),
        };
        assert_eq!(unavailable.code(), ErrorCode::ChannelUnavailable);
        assert!(AppError::from(unavailable).is_retryable());

        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(ChannelError::from(eof), ChannelError::Closed);
        assert_eq!(
            ChannelError::from(FrameError::UnknownKind(9)).code(),
            ErrorCode::ProtocolError
        );
    }
}
