//! Order-Level Price Calculator
//!
//! An order total is the sum of its file totals. There are no order-level
//! adjustments.

use rust_decimal::prelude::*;
use serde::Serialize;
use shared::{FileSpec, PricingTable};

use crate::calculator::{FilePrice, PricingWarning, price_file};
use crate::money::{round, to_f64};

/// Result of order price calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPrice {
    /// Per-file breakdown, same order as the input
    pub files: Vec<FilePrice>,
    pub total: f64,
}

impl OrderPrice {
    /// Warnings across all files, tagged with the file index
    pub fn warnings(&self) -> impl Iterator<Item = (usize, &PricingWarning)> {
        self.files
            .iter()
            .enumerate()
            .flat_map(|(index, file)| file.warnings.iter().map(move |w| (index, w)))
    }
}

/// Price every file of an order with one table
pub fn price_order(files: &[FileSpec], table: &PricingTable) -> OrderPrice {
    let files: Vec<FilePrice> = files.iter().map(|spec| price_file(spec, table)).collect();

    // file totals are already 2dp, summing them in Decimal keeps the sum exact
    let total = files
        .iter()
        .map(|file| round(Decimal::from_f64(file.total).unwrap_or_default()))
        .fold(Decimal::ZERO, Decimal::saturating_add);

    OrderPrice {
        files,
        total: to_f64(total),
    }
}
