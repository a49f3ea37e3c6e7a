//! Order status vocabulary and lifecycle
//!
//! ```text
//! Pending ──▶ Processing ──▶ Shipped ──▶ Delivered
//!    │            │   │          │
//!    │            │   └──▶ Completed
//!    ▼            ▼              ▼
//! Cancelled ◀─────┴──────────────┘
//! ```
//!
//! Staff may override a status from any state, so the lifecycle is advisory
//! unless [`TransitionPolicy::Strict`] is selected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{AppError, ErrorCode};

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Completed,
}

/// Status errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// Input is not one of the six known statuses
    #[error("invalid status: {0:?}")]
    InvalidStatus(String),

    /// Target is outside the lifecycle (strict policy only)
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

impl StatusError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidStatus(_) => ErrorCode::InvalidStatus,
            Self::IllegalTransition { .. } => ErrorCode::IllegalTransition,
        }
    }
}

impl From<StatusError> for AppError {
    fn from(err: StatusError) -> Self {
        match &err {
            StatusError::InvalidStatus(input) => AppError::invalid_status(input.clone()),
            StatusError::IllegalTransition { from, to } => {
                AppError::with_message(err.code(), err.to_string())
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
        }
    }
}

impl OrderStatus {
    /// All known statuses, in lifecycle order
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Completed,
    ];

    /// Canonical wire form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    /// Parse user or wire input.
    ///
    /// Case-insensitive; all whitespace (leading, trailing and internal) is
    /// stripped before matching.
    pub fn normalize(input: &str) -> Result<Self, StatusError> {
        let token: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match token.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(StatusError::InvalidStatus(input.to_string())),
        }
    }

    /// Next states along the nominal lifecycle
    pub const fn successors(&self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Completed, Self::Cancelled],
            Self::Shipped => &[Self::Delivered, Self::Cancelled],
            Self::Delivered | Self::Cancelled | Self::Completed => &[],
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Completed)
    }

    /// Whether `to` is a direct lifecycle successor of `self`
    pub fn is_lifecycle_transition(&self, to: OrderStatus) -> bool {
        self.successors().contains(&to)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = StatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<OrderStatus> for &'static str {
    fn from(status: OrderStatus) -> Self {
        status.as_str()
    }
}

/// 状态流转策略
///
/// `Permissive` mirrors the storefront's manual override: any known status is
/// reachable from any other. `Strict` only admits lifecycle successors (and
/// re-asserting the current status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    pub fn check_transition(&self, from: OrderStatus, to: OrderStatus) -> Result<(), StatusError> {
        if from == to || from.is_lifecycle_transition(to) {
            return Ok(());
        }
        match self {
            Self::Permissive => {
                tracing::debug!(%from, %to, "Off-lifecycle status override accepted");
                Ok(())
            }
            Self::Strict => Err(StatusError::IllegalTransition { from, to }),
        }
    }
}
