use std::fmt;

/// 连接状态
///
/// ```text
/// Disconnected ──▶ Connecting ──▶ Connected
///                      │              │ lost
///                      ▼              ▼
///                 Reconnecting ◀──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not started, or shut down
    #[default]
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    Connected,
    /// Waiting for, or running, a retry after a failure
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}
