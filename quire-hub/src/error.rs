use shared::{AppError, ErrorCode, FrameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Handshake missing, malformed or from an incompatible client
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl HubError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Bind { .. } => ErrorCode::ConfigError,
            Self::Closed | Self::Io(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::Frame(_) | Self::Payload(_) | Self::Handshake(_) => ErrorCode::ProtocolError,
        }
    }
}

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

impl From<HubError> for AppError {
    fn from(err: HubError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_is_closed() {
        let err: HubError = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, HubError::Closed));
        assert_eq!(err.code(), ErrorCode::NetworkError);
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = HubError::Handshake("version mismatch".into()).into();
        assert_eq!(app.code, ErrorCode::ProtocolError);
        assert!(app.message.contains("version mismatch"));
    }
}
