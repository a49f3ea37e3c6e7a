//! Local order collection and its synchronization
//!
//! - [`Reconciler`]: sole owner of the local orders; merges optimistic status
//!   patches with authoritative events (authority always wins)
//! - [`OrderSession`]: drives the reconciler from REST calls and channel notices

mod session;
mod store;

pub use session::{OrderSession, SessionUpdate};
pub use store::{EventOutcome, LocalOrder, PendingPatch, Reconciler, SyncMode};

use shared::{AppError, ErrorCode, StatusError};
use thiserror::Error;

use crate::ClientError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No local order with this id
    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error(transparent)]
    Status(#[from] StatusError),

    /// REST call failed; any optimistic patch has been reverted
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ReconcileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownOrder(_) => ErrorCode::OrderNotFound,
            Self::Status(e) => e.code(),
            Self::Client(e) => e.code(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownOrder(id) => AppError::order_not_found(id),
            ReconcileError::Status(e) => e.into(),
            ReconcileError::Client(e) => e.into(),
        }
    }
}
