//! Authoritative order object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;
use crate::models::FileSpec;

/// Order snapshot as held by the server
///
/// Replaced wholesale by sync events; only `status` is ever patched locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID (assigned by server)
    pub id: String,
    /// Store / tenant the order belongs to (also the sync room)
    pub store_id: String,
    /// Owner (customer) reference
    pub owner_id: String,
    /// Missing status at creation time defaults to `Pending`
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        store_id: impl Into<String>,
        owner_id: impl Into<String>,
        files: Vec<FileSpec>,
        total_price: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            store_id: store_id.into(),
            owner_id: owner_id.into(),
            status: OrderStatus::Pending,
            files,
            total_price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style status setter
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let json = r#"{
            "id": "o-1",
            "storeId": "s-1",
            "ownerId": "u-1",
            "totalPrice": 48.0,
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.files.is_empty());
    }

    #[test]
    fn test_status_is_case_insensitive_on_wire() {
        let json = r#"{
            "id": "o-1", "storeId": "s-1", "ownerId": "u-1", "status": "processing",
            "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        let out = serde_json::to_value(&order).unwrap();
        assert_eq!(out["status"], "Processing");
    }
}
