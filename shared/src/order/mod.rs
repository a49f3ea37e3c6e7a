//! Order model
//!
//! - Status: the six known order states and the lifecycle between them
//! - Snapshot: the authoritative order object as returned by the server

pub mod snapshot;
pub mod status;

// Re-exports
pub use snapshot::Order;
pub use status::{OrderStatus, StatusError, TransitionPolicy};
