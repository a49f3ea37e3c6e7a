//! OrderSession - one store's order view kept in sync
//!
//! Consumes the pricing engine (quotes), the REST source (writes and full
//! fetches), the channel (live events) and the reconciler (local state).

use quire_pricing::{OrderPrice, PricingTables};
use shared::{AppError, ErrorCategory, FileSpec, Order, OrderStatus};
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{EventOutcome, ReconcileError, Reconciler, SyncMode};
use crate::channel::{ChannelNotice, SyncChannel};
use crate::config::DEFAULT_TIMEOUT;
use crate::{ClientError, ClientResult, OrderDraft, OrderSource, StatusPatch};

/// What handling a notice did to the local view
#[derive(Debug)]
pub enum SessionUpdate {
    /// A channel event was applied
    Applied(EventOutcome),
    /// The collection was refetched
    Resynced { orders: usize },
    /// The view can no longer be trusted to be fresh
    Degraded { error: AppError },
}

pub struct OrderSession<S> {
    source: S,
    store_id: String,
    tables: PricingTables,
    reconciler: Reconciler,
    timeout: Duration,
    /// Cleared by `Disconnected`/`Unavailable`, set again by `Connected`.
    /// A session without a channel counts as up.
    channel_up: bool,
}

impl<S: OrderSource> OrderSession<S> {
    pub fn new(source: S, store_id: impl Into<String>, tables: PricingTables) -> Self {
        Self {
            source,
            store_id: store_id.into(),
            tables,
            reconciler: Reconciler::new(),
            timeout: DEFAULT_TIMEOUT,
            channel_up: true,
        }
    }

    /// Bound every REST call, including the full resync
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// For focus changes; order data should only change through the session
    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    /// Join this store's room and subscribe to its notices
    pub fn attach(&self, channel: &SyncChannel) -> broadcast::Receiver<ChannelNotice> {
        let notices = channel.subscribe();
        channel.join(self.store_id.clone());
        notices
    }

    async fn bounded<T>(&self, call: impl Future<Output = ClientResult<T>>) -> ClientResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
    }

    /// Price files with this store's table
    pub fn quote(&self, files: &[FileSpec]) -> OrderPrice {
        self.tables.price_order(&self.store_id, files)
    }

    /// Price, create, and insert the server's copy of a new order
    pub async fn submit(&mut self, owner_id: &str, files: Vec<FileSpec>) -> Result<(Order, OrderPrice), ReconcileError> {
        let price = self.quote(&files);
        for (index, warning) in price.warnings() {
            tracing::info!(file = index, code = %warning.code(), "Pricing warning: {:?}", warning);
        }

        let draft = OrderDraft {
            store_id: self.store_id.clone(),
            owner_id: owner_id.to_string(),
            files,
            total_price: price.total,
        };
        let order = self.bounded(self.source.create_order(&draft)).await?;
        tracing::info!(order_id = %order.id, total = price.total, "Order submitted");

        self.reconciler.apply_authoritative(order.clone());
        Ok((order, price))
    }

    /// Change an order's status: applied locally at once, confirmed by PUT.
    ///
    /// On failure the local patch is reverted and the error returned; check
    /// [`ReconcileError::is_retryable`] to offer a retry.
    pub async fn change_status(&mut self, order_id: &str, status: &str) -> Result<Order, ReconcileError> {
        let status = OrderStatus::normalize(status)?;
        let patch = StatusPatch::new(status);
        self.reconciler.apply_optimistic(order_id, patch)?;

        match self.bounded(self.source.update_status(order_id, &patch)).await {
            Ok(order) => {
                self.reconciler.apply_authoritative(order.clone());
                Ok(order)
            }
            Err(e) => {
                self.reconciler.reject_optimistic(order_id)?;
                tracing::warn!(order_id, status = %status, retryable = e.is_retryable(), "Status update failed, reverted: {}", e);
                Err(e.into())
            }
        }
    }

    /// Refetch the whole collection.
    ///
    /// On failure the last known-good orders stay in place and the view is
    /// marked degraded.
    pub async fn resync(&mut self) -> Result<usize, ReconcileError> {
        match self.bounded(self.source.list_orders()).await {
            Ok(orders) => {
                let count = orders.len();
                self.reconciler.replace_all(orders);
                let mode = if self.channel_up { SyncMode::Live } else { SyncMode::Degraded };
                self.reconciler.set_mode(mode);
                tracing::info!(store_id = %self.store_id, orders = count, ?mode, "Orders resynced");
                Ok(count)
            }
            Err(e) => {
                self.reconciler.set_mode(SyncMode::Degraded);
                let code = e.code();
                if code.category() == ErrorCategory::System {
                    tracing::warn!(store_id = %self.store_id, %code, "Resync failed, keeping last known orders: {}", e);
                } else {
                    // The server answered, but not with a usable collection
                    tracing::error!(
                        store_id = %self.store_id,
                        %code,
                        category = code.category().name(),
                        "Resync rejected, keeping last known orders: {}",
                        e
                    );
                }
                Err(e.into())
            }
        }
    }

    async fn resync_update(&mut self) -> SessionUpdate {
        match self.resync().await {
            Ok(orders) => SessionUpdate::Resynced { orders },
            Err(e) => SessionUpdate::Degraded { error: e.into() },
        }
    }

    /// Apply one channel notice
    pub async fn handle_notice(&mut self, notice: ChannelNotice) -> SessionUpdate {
        match notice {
            ChannelNotice::Event { room, event } => {
                if room != self.store_id {
                    tracing::debug!(room = %room, "Event for another store, ignored");
                    return SessionUpdate::Applied(EventOutcome::Unchanged);
                }
                match self.reconciler.apply_event(&event) {
                    EventOutcome::ResyncRequired => self.resync_update().await,
                    outcome => SessionUpdate::Applied(outcome),
                }
            }
            // Events may have been missed; buffered state is not trusted
            ChannelNotice::Connected { resumed } => {
                tracing::debug!(resumed, "Channel connected, resyncing");
                self.channel_up = true;
                self.resync_update().await
            }
            ChannelNotice::Disconnected => {
                self.channel_up = false;
                self.reconciler.set_mode(SyncMode::Degraded);
                SessionUpdate::Degraded {
                    error: AppError::network("Sync channel disconnected"),
                }
            }
            ChannelNotice::Unavailable { error } => {
                self.channel_up = false;
                self.reconciler.set_mode(SyncMode::Degraded);
                SessionUpdate::Degraded {
                    error: error.into(),
                }
            }
        }
    }

    /// Wait for the next notice and apply it. `None` once the channel is gone.
    pub async fn follow(&mut self, notices: &mut broadcast::Receiver<ChannelNotice>) -> Option<SessionUpdate> {
        match notices.recv().await {
            Ok(notice) => Some(self.handle_notice(notice).await),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notice receiver lagged, resyncing");
                Some(self.resync_update().await)
            }
            Err(RecvError::Closed) => None,
        }
    }
}
