//! Quire Client - storefront side of the order sync
//!
//! - [`HttpClient`]: REST access to `/orders` behind the [`OrderSource`] trait
//! - [`SyncChannel`]: persistent, room-scoped event channel with automatic reconnect
//! - [`Reconciler`]: the local order collection, merging optimistic writes with
//!   authoritative events
//! - [`OrderSession`]: glue that prices, submits and keeps the collection in sync

pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod reconcile;
pub mod types;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, OrderSource};
pub use types::{OrderDraft, StatusPatch};

// Channel
pub use channel::{
    ChannelConfig, ChannelError, ChannelNotice, ConnectionState, Connector, MemoryConnector,
    MemoryTransport, SyncChannel, TcpConnector, TcpTransport, Transport,
};

// Reconciliation
pub use reconcile::{
    EventOutcome, LocalOrder, OrderSession, PendingPatch, ReconcileError, Reconciler,
    SessionUpdate, SyncMode,
};

// Re-export shared types for convenience
pub use shared::{ChannelEvent, EventKind, Order, OrderStatus};
