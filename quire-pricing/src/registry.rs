//! Store-scoped pricing tables
//!
//! Each store may configure its own [`PricingTable`]. Stores without one are
//! priced with the fallback table ([`PricingTable::DEFAULT`] unless replaced).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::{FileSpec, PricingTable};

use crate::order_calculator::{OrderPrice, price_order};

/// 门店价格表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTables {
    /// Table used for stores without their own entry
    pub fallback: PricingTable,
    /// store_id -> table
    pub stores: HashMap<String, PricingTable>,
}

impl PricingTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fallback table
    pub fn with_fallback(mut self, table: PricingTable) -> Self {
        self.fallback = table;
        self
    }

    /// Set a store's table, returning the previous one
    pub fn insert(&mut self, store_id: impl Into<String>, table: PricingTable) -> Option<PricingTable> {
        self.stores.insert(store_id.into(), table)
    }

    pub fn remove(&mut self, store_id: &str) -> Option<PricingTable> {
        self.stores.remove(store_id)
    }

    /// The table that prices `store_id`'s orders
    pub fn table_for(&self, store_id: &str) -> &PricingTable {
        match self.stores.get(store_id) {
            Some(table) => table,
            None => {
                tracing::trace!(store_id, "No store pricing table, using fallback");
                &self.fallback
            }
        }
    }

    /// Price an order with the store's table
    pub fn price_order(&self, store_id: &str, files: &[FileSpec]) -> OrderPrice {
        price_order(files, self.table_for(store_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PrintMode;

    #[test]
    fn test_unknown_store_uses_fallback() {
        let tables = PricingTables::new();
        assert_eq!(tables.table_for("nowhere"), &PricingTable::DEFAULT);
    }

    #[test]
    fn test_store_table_overrides_fallback() {
        let mut custom = PricingTable::DEFAULT;
        custom.color.single = 4.0;

        let mut tables = PricingTables::new();
        assert!(tables.insert("s-1", custom).is_none());

        let files = vec![FileSpec {
            print_mode: PrintMode::Color,
            page_count: Some(2),
            ..Default::default()
        }];
        assert_eq!(tables.price_order("s-1", &files).total, 8.0);
        assert_eq!(tables.price_order("s-2", &files).total, 10.0);

        assert_eq!(tables.remove("s-1"), Some(custom));
        assert_eq!(tables.price_order("s-1", &files).total, 10.0);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{ "stores": { "s-9": { "bw": { "single": 1, "double": 1.5 } } } }"#;
        let tables: PricingTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.fallback, PricingTable::DEFAULT);
        assert_eq!(tables.table_for("s-9").bw.single, 1.0);
        assert_eq!(tables.table_for("s-9").color, PricingTable::DEFAULT.color);
    }

    #[test]
    fn test_deserialize_table_with_one_side_only() {
        let json = r#"{ "stores": { "s-9": { "bw": { "single": 1 } } } }"#;
        let tables: PricingTables = serde_json::from_str(json).unwrap();
        let table = tables.table_for("s-9");
        assert_eq!(table.bw.single, 1.0);
        assert_eq!(table.bw.double, PricingTable::DEFAULT.bw.double);
        assert_eq!(table.color, PricingTable::DEFAULT.color);

        let files = vec![FileSpec {
            page_count: Some(4),
            duplex: true,
            ..Default::default()
        }];
        // 4 pages × default double-sided unit 3
        assert_eq!(tables.price_order("s-9", &files).total, 12.0);
    }
}
