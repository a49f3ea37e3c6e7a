//! REST request bodies

use serde::{Deserialize, Serialize};
use shared::{FileSpec, OrderStatus};

/// `PUT /orders/{id}` body. Only the status is ever patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub status: OrderStatus,
}

impl StatusPatch {
    pub fn new(status: OrderStatus) -> Self {
        Self { status }
    }
}

/// `POST /orders` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub store_id: String,
    pub owner_id: String,
    pub files: Vec<FileSpec>,
    /// Client-side quote; the server may re-price
    pub total_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_patch_wire_shape() {
        let body = serde_json::to_value(StatusPatch::new(OrderStatus::Shipped)).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "Shipped" }));
    }

    #[test]
    fn test_draft_is_camel_case() {
        let draft = OrderDraft {
            store_id: "s-1".into(),
            owner_id: "u-1".into(),
            files: vec![],
            total_price: 12.5,
        };
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body["storeId"], "s-1");
        assert_eq!(body["totalPrice"], 12.5);
    }
}
