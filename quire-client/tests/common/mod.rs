#![allow(dead_code)]

use async_trait::async_trait;
use quire_client::{ClientError, ClientResult, OrderDraft, OrderSource, StatusPatch};
use shared::{Order, OrderStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stand-in for the order service, shared with the test body
#[derive(Clone, Default)]
pub struct SharedSource {
    orders: Arc<Mutex<Vec<Order>>>,
    offline: Arc<Mutex<bool>>,
}

impl SharedSource {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Arc::new(Mutex::new(orders)),
            ..Default::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Change the server-side copy without any event being published
    pub fn set_status(&self, order_id: &str, status: OrderStatus) {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
            order.status = status;
        }
    }

    pub fn remove(&self, order_id: &str) {
        self.orders.lock().unwrap().retain(|o| o.id != order_id);
    }

    fn check_online(&self) -> ClientResult<()> {
        if *self.offline.lock().unwrap() {
            Err(ClientError::Timeout(Duration::from_secs(5)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderSource for SharedSource {
    async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        self.check_online()?;
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        self.check_online()?;
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(order_id.to_string()))
    }

    async fn update_status(&self, order_id: &str, patch: &StatusPatch) -> ClientResult<Order> {
        self.check_online()?;
        self.set_status(order_id, patch.status);
        self.get_order(order_id).await
    }

    async fn create_order(&self, draft: &OrderDraft) -> ClientResult<Order> {
        self.check_online()?;
        let mut orders = self.orders.lock().unwrap();
        let order = Order::new(
            format!("o-{}", orders.len() + 1),
            draft.store_id.clone(),
            draft.owner_id.clone(),
            draft.files.clone(),
            draft.total_price,
        );
        orders.insert(0, order.clone());
        Ok(order)
    }
}

pub fn order(id: &str, status: OrderStatus) -> Order {
    Order::new(id, "s-1", "u-1", vec![], 20.0).with_status(status)
}
