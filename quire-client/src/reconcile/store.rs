//! Reconciler - the local order collection
//!
//! Mutation rules:
//! - optimistic writes touch only `status` and remember the last
//!   authoritative status so they can be reverted
//! - authoritative updates replace the whole order and drop any pending patch
//! - `ordersInvalidated` reverts every pending patch and asks for a resync

use chrono::{DateTime, Utc};
use shared::{ChannelEvent, Order, OrderStatus, TransitionPolicy};

use super::ReconcileError;
use crate::StatusPatch;

/// Whether the local view is known to be fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Channel connected and the last resync succeeded
    #[default]
    Live,
    /// Channel or REST unavailable; the last known-good state is shown
    Degraded,
}

/// Optimistic status change awaiting confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPatch {
    pub patch: StatusPatch,
    /// Status before the first unconfirmed patch
    pub authoritative_status: OrderStatus,
    pub applied_at: DateTime<Utc>,
}

/// One order as held locally
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOrder {
    pub order: Order,
    /// Set while an optimistic write is unconfirmed
    pub pending: Option<PendingPatch>,
}

impl LocalOrder {
    fn authoritative(order: Order) -> Self {
        Self { order, pending: None }
    }

    pub fn is_pending_confirmation(&self) -> bool {
        self.pending.is_some()
    }

    /// Undo an unconfirmed patch
    fn revert(&mut self) -> Option<OrderStatus> {
        let pending = self.pending.take()?;
        self.order.status = pending.authoritative_status;
        Some(pending.authoritative_status)
    }
}

/// What an applied event changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Order added
    Inserted,
    /// Order replaced by the authoritative copy
    Replaced,
    /// Order removed
    Removed,
    /// The focused order was removed; focus is now empty
    FocusCleared,
    /// Local view is stale; refetch the full collection
    ResyncRequired,
    /// Nothing changed
    Unchanged,
}

/// 本地订单集合
///
/// Orders are kept newest first. Nothing outside this type mutates them.
#[derive(Debug, Default)]
pub struct Reconciler {
    orders: Vec<LocalOrder>,
    focus: Option<String>,
    policy: TransitionPolicy,
    mode: SyncMode,
    stale: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========== Queries ==========

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders as currently displayed (optimistic statuses included)
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().map(|local| &local.order)
    }

    pub fn get(&self, order_id: &str) -> Option<&LocalOrder> {
        self.orders.iter().find(|local| local.order.id == order_id)
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.get(order_id).map(|local| &local.order)
    }

    fn get_mut(&mut self, order_id: &str) -> Option<&mut LocalOrder> {
        self.orders.iter_mut().find(|local| local.order.id == order_id)
    }

    fn position(&self, order_id: &str) -> Option<usize> {
        self.orders.iter().position(|local| local.order.id == order_id)
    }

    pub fn pending_count(&self) -> usize {
        self.orders.iter().filter(|local| local.is_pending_confirmation()).count()
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// True after `ordersInvalidated` until the next [`Reconciler::replace_all`]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_mode(&mut self, mode: SyncMode) {
        if self.mode != mode {
            tracing::info!(?mode, "Order view sync mode changed");
            self.mode = mode;
        }
    }

    // ========== Focus ==========

    /// The order currently shown in detail, if any
    pub fn focus(&self) -> Option<&Order> {
        self.focus.as_deref().and_then(|id| self.order(id))
    }

    pub fn set_focus(&mut self, order_id: &str) -> Result<(), ReconcileError> {
        if self.position(order_id).is_none() {
            return Err(ReconcileError::UnknownOrder(order_id.to_string()));
        }
        self.focus = Some(order_id.to_string());
        Ok(())
    }

    pub fn clear_focus(&mut self) {
        self.focus = None;
    }

    // ========== Mutations ==========

    /// Apply a local status change before the server confirms it.
    ///
    /// Returns the status shown before the patch.
    pub fn apply_optimistic(&mut self, order_id: &str, patch: StatusPatch) -> Result<OrderStatus, ReconcileError> {
        let policy = self.policy;
        let local = self
            .get_mut(order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(order_id.to_string()))?;

        let previous = local.order.status;
        policy.check_transition(previous, patch.status)?;

        // Stacked patches keep the oldest authoritative status
        let authoritative_status = local
            .pending
            .map(|pending| pending.authoritative_status)
            .unwrap_or(previous);
        local.pending = Some(PendingPatch {
            patch,
            authoritative_status,
            applied_at: Utc::now(),
        });
        local.order.status = patch.status;

        tracing::debug!(order_id, from = %previous, to = %patch.status, "Optimistic status applied");
        Ok(previous)
    }

    /// Revert an optimistic patch whose write failed.
    ///
    /// Returns the restored status, or `None` if nothing was pending.
    pub fn reject_optimistic(&mut self, order_id: &str) -> Result<Option<OrderStatus>, ReconcileError> {
        let local = self
            .get_mut(order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(order_id.to_string()))?;
        let restored = local.revert();
        if let Some(status) = restored {
            tracing::debug!(order_id, restored = %status, "Optimistic status reverted");
        }
        Ok(restored)
    }

    /// Install an authoritative copy (from an event or a REST response).
    ///
    /// Replaces unconditionally and clears any pending patch; inserts at the
    /// front when absent.
    pub fn apply_authoritative(&mut self, order: Order) -> EventOutcome {
        match self.get_mut(&order.id) {
            Some(local) => {
                if local.pending.is_none() && local.order == order {
                    return EventOutcome::Unchanged;
                }
                if let Some(pending) = local.pending {
                    if pending.patch.status != order.status {
                        tracing::info!(
                            order_id = %order.id,
                            optimistic = %pending.patch.status,
                            authoritative = %order.status,
                            "Optimistic status overridden by server"
                        );
                    }
                }
                *local = LocalOrder::authoritative(order);
                EventOutcome::Replaced
            }
            None => {
                self.orders.insert(0, LocalOrder::authoritative(order));
                EventOutcome::Inserted
            }
        }
    }

    fn remove(&mut self, order_id: &str) -> EventOutcome {
        let Some(index) = self.position(order_id) else {
            return EventOutcome::Unchanged;
        };
        self.orders.remove(index);

        if self.focus.as_deref() == Some(order_id) {
            self.focus = None;
            tracing::debug!(order_id, "Focused order deleted");
            EventOutcome::FocusCleared
        } else {
            EventOutcome::Removed
        }
    }

    /// Revert every pending patch and mark the view stale
    fn invalidate(&mut self) -> EventOutcome {
        let reverted = self
            .orders
            .iter_mut()
            .filter_map(LocalOrder::revert)
            .count();
        self.stale = true;
        tracing::info!(reverted, "Orders invalidated, resync required");
        EventOutcome::ResyncRequired
    }

    /// Apply one channel event
    pub fn apply_event(&mut self, event: &ChannelEvent) -> EventOutcome {
        match event {
            ChannelEvent::OrderCreated(order) => {
                if self.position(&order.id).is_some() {
                    EventOutcome::Unchanged
                } else {
                    self.orders.insert(0, LocalOrder::authoritative(order.clone()));
                    EventOutcome::Inserted
                }
            }
            ChannelEvent::OrderUpdated(order) => self.apply_authoritative(order.clone()),
            ChannelEvent::OrderDeleted { order_id } => self.remove(order_id),
            ChannelEvent::OrdersInvalidated => self.invalidate(),
        }
    }

    /// Install a full snapshot from `GET /orders`.
    ///
    /// Pending patches are dropped; focus is cleared if its order is gone.
    /// The sync mode is left alone: only the owner knows whether the channel is up.
    pub fn replace_all(&mut self, orders: Vec<Order>) -> EventOutcome {
        self.orders = orders.into_iter().map(LocalOrder::authoritative).collect();
        self.stale = false;

        let focus_gone = self
            .focus
            .as_deref()
            .is_some_and(|id| self.position(id).is_none());
        if focus_gone {
            self.focus = None;
            EventOutcome::FocusCleared
        } else {
            EventOutcome::Replaced
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order::new(id, "s-1", "u-1", vec![], 48.0).with_status(status)
    }

    fn seeded() -> Reconciler {
        let mut store = Reconciler::new();
        store.replace_all(vec![
            order("o-2", OrderStatus::Pending),
            order("o-1", OrderStatus::Processing),
        ]);
        store
    }

    #[test]
    fn test_optimistic_only_touches_status() {
        let mut store = seeded();
        let before = store.order("o-2").unwrap().clone();

        let previous = store
            .apply_optimistic("o-2", StatusPatch::new(OrderStatus::Processing))
            .unwrap();
        assert_eq!(previous, OrderStatus::Pending);

        let after = store.get("o-2").unwrap();
        assert_eq!(after.order.status, OrderStatus::Processing);
        assert_eq!(after.order.total_price, before.total_price);
        assert_eq!(after.order.updated_at, before.updated_at);
        assert!(after.is_pending_confirmation());
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn test_optimistic_unknown_order() {
        let mut store = seeded();
        let err = store
            .apply_optimistic("nope", StatusPatch::new(OrderStatus::Shipped))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownOrder(id) if id == "nope"));
    }

    #[test]
    fn test_authority_wins_over_optimistic() {
        let mut store = seeded();
        store
            .apply_optimistic("o-2", StatusPatch::new(OrderStatus::Processing))
            .unwrap();

        let event = ChannelEvent::OrderUpdated(order("o-2", OrderStatus::Cancelled));
        assert_eq!(store.apply_event(&event), EventOutcome::Replaced);
        let local = store.get("o-2").unwrap();
        assert_eq!(local.order.status, OrderStatus::Cancelled);
        assert!(!local.is_pending_confirmation());

        // applying the same update again changes nothing
        assert_eq!(store.apply_event(&event), EventOutcome::Unchanged);
        assert_eq!(store.order("o-2").unwrap().status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_stacked_patches_revert_to_authoritative() {
        let mut store = seeded();
        store
            .apply_optimistic("o-1", StatusPatch::new(OrderStatus::Shipped))
            .unwrap();
        store
            .apply_optimistic("o-1", StatusPatch::new(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(store.reject_optimistic("o-1").unwrap(), Some(OrderStatus::Processing));
        assert_eq!(store.order("o-1").unwrap().status, OrderStatus::Processing);
        assert_eq!(store.reject_optimistic("o-1").unwrap(), None);
    }

    #[test]
    fn test_strict_policy_rejects_off_lifecycle() {
        let mut store = seeded().with_policy(TransitionPolicy::Strict);
        let err = store
            .apply_optimistic("o-2", StatusPatch::new(OrderStatus::Delivered))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Status(_)));
        assert_eq!(store.order("o-2").unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_permissive_policy_allows_override() {
        let mut store = seeded();
        store
            .apply_optimistic("o-2", StatusPatch::new(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(store.order("o-2").unwrap().status, OrderStatus::Delivered);
    }

    #[test]
    fn test_created_prepends_once() {
        let mut store = seeded();
        let event = ChannelEvent::OrderCreated(order("o-3", OrderStatus::Pending));
        assert_eq!(store.apply_event(&event), EventOutcome::Inserted);
        assert_eq!(store.apply_event(&event), EventOutcome::Unchanged);
        assert_eq!(store.orders().next().unwrap().id, "o-3");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_updated_inserts_when_absent() {
        let mut store = Reconciler::new();
        let event = ChannelEvent::OrderUpdated(order("o-7", OrderStatus::Shipped));
        assert_eq!(store.apply_event(&event), EventOutcome::Inserted);
        assert_eq!(store.order("o-7").unwrap().status, OrderStatus::Shipped);
    }

    #[test]
    fn test_delete_focused_order_clears_focus() {
        let mut store = seeded();
        store.set_focus("o-1").unwrap();
        assert_eq!(store.focus().unwrap().id, "o-1");

        let deleted = ChannelEvent::OrderDeleted {
            order_id: "o-2".into(),
        };
        assert_eq!(store.apply_event(&deleted), EventOutcome::Removed);

        let deleted = ChannelEvent::OrderDeleted {
            order_id: "o-1".into(),
        };
        assert_eq!(store.apply_event(&deleted), EventOutcome::FocusCleared);
        assert!(store.focus().is_none());
        assert!(store.is_empty());
        assert_eq!(store.apply_event(&deleted), EventOutcome::Unchanged);
    }

    #[test]
    fn test_invalidate_reverts_and_requires_resync() {
        let mut store = seeded();
        store
            .apply_optimistic("o-2", StatusPatch::new(OrderStatus::Cancelled))
            .unwrap();

        assert_eq!(
            store.apply_event(&ChannelEvent::OrdersInvalidated),
            EventOutcome::ResyncRequired
        );
        assert!(store.is_stale());
        assert_eq!(store.order("o-2").unwrap().status, OrderStatus::Pending);
        assert_eq!(store.pending_count(), 0);

        store.replace_all(vec![order("o-2", OrderStatus::Shipped)]);
        assert!(!store.is_stale());
        assert_eq!(store.order("o-2").unwrap().status, OrderStatus::Shipped);
    }

    #[test]
    fn test_replace_all_drops_missing_focus() {
        let mut store = seeded();
        store.set_focus("o-1").unwrap();
        store.set_mode(SyncMode::Degraded);

        assert_eq!(
            store.replace_all(vec![order("o-2", OrderStatus::Pending)]),
            EventOutcome::FocusCleared
        );
        assert!(store.focus().is_none());
        assert_eq!(store.mode(), SyncMode::Degraded);
        assert!(store.set_focus("o-1").is_err());
    }
}
