//! Shared types for Quire
//!
//! Data model used across the pricing engine, the sync client and the hub:
//! print specifications, pricing tables, orders, channel frames and the
//! unified error codes.

pub mod error;
pub mod message;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{ChannelEvent, EventKind, Frame, FrameError, FrameKind};
pub use models::{Binding, BindingType, FileSource, FileSpec, PricingTable, PrintMode, SpecialPaper};
pub use order::{Order, OrderStatus, StatusError, TransitionPolicy};
