//! Data models
//!
//! Shared between the pricing engine, the sync client and the storefront
//! frontend (via API). Wire format is camelCase JSON.

pub mod file_spec;
pub mod pricing_table;

// Re-exports
pub use file_spec::*;
pub use pricing_table::*;
