//! File Price Calculator
//!
//! Prices one [`FileSpec`] against a [`PricingTable`].
//!
//! # Calculation Steps
//! 1. Resolve the page count (known, else estimated from upload metadata)
//! 2. Split pages into color / black-and-white (mixed mode uses the color page spec)
//! 3. Base price = Σ pages × unit (unit chosen by duplex), × copies
//! 4. Paper surcharge = paper unit × pages × copies
//! 5. Binding surcharge, once per file
//!
//! Uses rust_decimal for the arithmetic, reports as f64.

use rust_decimal::prelude::*;
use serde::Serialize;
use shared::{AppError, ErrorCode, FileSpec, PricingTable, PrintMode};

use crate::estimate::estimate_or_default;
use crate::money::{to_decimal, to_f64};
use crate::page_range::{malformed_tokens, parse, validate_against_page_count};

/// 计价提示 (never blocks pricing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PricingWarning {
    /// No page count was given; `pages` was estimated
    #[serde(rename_all = "camelCase")]
    PageCountEstimated { pages: u32 },
    /// Color pages above the page count were ignored
    #[serde(rename_all = "camelCase")]
    OutOfRangePages { pages: Vec<u32>, page_count: u32 },
    /// Tokens of the color page spec that were not understood
    #[serde(rename_all = "camelCase")]
    MalformedPageTokens { tokens: Vec<String> },
}

impl PricingWarning {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PageCountEstimated { .. } => ErrorCode::PageCountEstimated,
            Self::OutOfRangePages { .. } => ErrorCode::OutOfRangePages,
            Self::MalformedPageTokens { .. } => ErrorCode::MalformedPageToken,
        }
    }
}

impl From<&PricingWarning> for AppError {
    fn from(warning: &PricingWarning) -> Self {
        match warning {
            PricingWarning::PageCountEstimated { pages } => {
                AppError::new(ErrorCode::PageCountEstimated).with_detail("pages", *pages)
            }
            PricingWarning::OutOfRangePages { pages, page_count } => {
                AppError::out_of_range_pages(pages, *page_count)
            }
            PricingWarning::MalformedPageTokens { tokens } => {
                AppError::new(ErrorCode::MalformedPageToken).with_detail("tokens", tokens.clone())
            }
        }
    }
}

/// Price breakdown for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePrice {
    /// Pages per copy (known or estimated)
    pub pages: u32,
    pub color_pages: u32,
    pub bw_pages: u32,
    /// Printing cost for all copies
    pub base: f64,
    pub paper_surcharge: f64,
    pub binding_surcharge: f64,
    pub total: f64,
    pub warnings: Vec<PricingWarning>,
}

impl FilePrice {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Split `pages` into (color, black-and-white) for the file's print mode
fn split_pages(spec: &FileSpec, pages: u32, warnings: &mut Vec<PricingWarning>) -> (u32, u32) {
    match spec.print_mode {
        PrintMode::BlackAndWhite => (0, pages),
        PrintMode::Color => (pages, 0),
        PrintMode::Mixed => {
            let color_spec = spec.color_page_spec.as_str();

            let malformed = malformed_tokens(color_spec);
            if !malformed.is_empty() {
                warnings.push(PricingWarning::MalformedPageTokens {
                    tokens: malformed.into_iter().map(str::to_string).collect(),
                });
            }

            let validation = validate_against_page_count(&parse(color_spec), pages);
            if !validation.is_clean() {
                warnings.push(PricingWarning::OutOfRangePages {
                    pages: validation.invalid.iter().copied().collect(),
                    page_count: pages,
                });
            }

            // valid ⊆ [1, pages], so this never exceeds `pages`
            let color = u32::try_from(validation.valid.len()).unwrap_or(pages);
            (color, pages - color)
        }
    }
}

/// Price one file. Never fails; questionable input is reported in `warnings`.
pub fn price_file(spec: &FileSpec, table: &PricingTable) -> FilePrice {
    let mut warnings = Vec::new();

    let pages = match spec.page_count {
        Some(count) if count > 0 => count,
        _ => {
            let estimated = estimate_or_default(spec.source.as_ref());
            warnings.push(PricingWarning::PageCountEstimated { pages: estimated });
            estimated
        }
    };
    let (color_pages, bw_pages) = split_pages(spec, pages, &mut warnings);

    let copies = Decimal::from(spec.effective_copies());
    let bw_unit = to_decimal(table.page_unit(PrintMode::BlackAndWhite, spec.duplex));
    let color_unit = to_decimal(table.page_unit(PrintMode::Color, spec.duplex));

    let per_copy = bw_unit
        .saturating_mul(Decimal::from(bw_pages))
        .saturating_add(color_unit.saturating_mul(Decimal::from(color_pages)));
    let base = per_copy.saturating_mul(copies);

    let paper_surcharge = to_decimal(table.paper_unit(spec.special_paper))
        .saturating_mul(Decimal::from(pages))
        .saturating_mul(copies);

    // 装订按文件收费, 与份数无关
    let binding_surcharge = to_decimal(table.binding_price(spec.binding.effective()));

    let total = base
        .saturating_add(paper_surcharge)
        .saturating_add(binding_surcharge);

    tracing::trace!(
        pages,
        color_pages,
        bw_pages,
        copies = spec.effective_copies(),
        total = %total,
        "Priced file"
    );

    FilePrice {
        pages,
        color_pages,
        bw_pages,
        base: to_f64(base),
        paper_surcharge: to_f64(paper_surcharge),
        binding_surcharge: to_f64(binding_surcharge),
        total: to_f64(total),
        warnings,
    }
}
