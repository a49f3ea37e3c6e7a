//! Quire pricing engine
//!
//! Turns per-file print options into a price:
//! - [`page_range`]: parse, validate and serialize page-range strings
//! - [`estimate`]: advisory page-count estimation from upload metadata
//! - [`price_file`] / [`price_order`]: the deterministic price calculation
//! - [`PricingTables`]: store-scoped tables with a built-in fallback
//!
//! Pricing never fails: malformed input degrades to the cheapest/no-op value
//! and is reported through [`PricingWarning`].

mod calculator;
pub mod estimate;
mod money;
mod order_calculator;
pub mod page_range;
mod registry;

pub use calculator::*;
pub use order_calculator::*;
pub use registry::*;
