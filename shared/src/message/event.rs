//! Order sync events carried inside `Event` frames

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::Order;

/// 订单同步事件
///
/// Wire form: `{"event": "orderUpdated", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChannelEvent {
    OrderCreated(Order),
    OrderUpdated(Order),
    #[serde(rename_all = "camelCase")]
    OrderDeleted { order_id: String },
    OrdersInvalidated,
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::OrderCreated(_) => EventKind::OrderCreated,
            Self::OrderUpdated(_) => EventKind::OrderUpdated,
            Self::OrderDeleted { .. } => EventKind::OrderDeleted,
            Self::OrdersInvalidated => EventKind::OrdersInvalidated,
        }
    }

    /// The order id this event concerns, if any
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::OrderCreated(order) | Self::OrderUpdated(order) => Some(&order.id),
            Self::OrderDeleted { order_id } => Some(order_id),
            Self::OrdersInvalidated => None,
        }
    }
}

/// 事件类型 (用于注册回调)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    OrdersInvalidated,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderCreated => write!(f, "orderCreated"),
            Self::OrderUpdated => write!(f, "orderUpdated"),
            Self::OrderDeleted => write!(f, "orderDeleted"),
            Self::OrdersInvalidated => write!(f, "ordersInvalidated"),
        }
    }
}
