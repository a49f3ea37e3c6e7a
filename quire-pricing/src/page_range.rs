//! Page-range strings
//!
//! Grammar: `spec := token (',' token)*`, `token := INT | INT '-' INT`.
//! Page numbers are 1-based. Tokens that do not parse are dropped silently,
//! since the input is free text typed by customers. A token wider than
//! [`MAX_RANGE_SPAN`] pages counts as unparsable.
//!
//! ```
//! use quire_pricing::page_range::{parse, serialize};
//!
//! let pages = parse("5-6, 1,3, x, 3");
//! assert_eq!(pages.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 6]);
//! assert_eq!(serialize(&pages), "1,3,5-6");
//! ```

use std::collections::BTreeSet;
use std::fmt;

/// Set of 1-based page numbers, always ordered
pub type PageSet = BTreeSet<u32>;

/// Widest range a single token may expand to. Wider tokens are treated as
/// malformed so a typo like `1-4000000000` cannot exhaust memory.
pub const MAX_RANGE_SPAN: u32 = 100_000;

/// One inclusive `start-end` token (`start == end` for a single page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn single(page: u32) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    /// Number of pages covered
    pub fn span(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_page(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    // u32::from_str accepts a leading '+', page numbers do not
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok().filter(|&page| page >= 1)
}

fn parse_token(token: &str) -> Option<PageRange> {
    let token = token.trim();
    let range = match token.split_once('-') {
        Some((start, end)) => {
            let start = parse_page(start)?;
            let end = parse_page(end)?;
            if start > end {
                return None;
            }
            PageRange { start, end }
        }
        None => PageRange::single(parse_page(token)?),
    };

    if range.span() > MAX_RANGE_SPAN {
        tracing::debug!(token, "Page range too wide, dropped");
        return None;
    }
    Some(range)
}

/// Well-formed tokens of `spec`, in input order
pub fn ranges(spec: &str) -> Vec<PageRange> {
    spec.split(',').filter_map(parse_token).collect()
}

/// Non-blank tokens of `spec` that [`parse`] drops
pub fn malformed_tokens(spec: &str) -> Vec<&str> {
    spec.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && parse_token(token).is_none())
        .collect()
}

/// Parse a page-range string into a deduplicated page set.
///
/// No upper bound is enforced here; see [`validate_against_page_count`].
/// A token covering more than [`MAX_RANGE_SPAN`] pages is dropped whole
/// (and listed by [`malformed_tokens`]), so a set containing such a run does
/// not survive `parse(&serialize(..))`.
pub fn parse(spec: &str) -> PageSet {
    ranges(spec).iter().flat_map(PageRange::pages).collect()
}

/// Pages split by whether they exist in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageValidation {
    /// Pages in `[1, page_count]`
    pub valid: PageSet,
    /// Pages above `page_count`
    pub invalid: PageSet,
}

impl PageValidation {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

pub fn validate_against_page_count(pages: &PageSet, page_count: u32) -> PageValidation {
    let (valid, invalid) = pages.iter().copied().partition(|&page| page <= page_count);
    PageValidation { valid, invalid }
}

/// Collapse consecutive runs
fn collapse(pages: &PageSet) -> Vec<PageRange> {
    let mut runs: Vec<PageRange> = Vec::new();
    for &page in pages {
        match runs.last_mut() {
            Some(run) if run.end.checked_add(1) == Some(page) => run.end = page,
            _ => runs.push(PageRange::single(page)),
        }
    }
    runs
}

/// Canonical string form: ascending, consecutive runs merged, comma-joined.
///
/// `parse(&serialize(&p)) == p` for every page set whose runs fit in
/// [`MAX_RANGE_SPAN`].
pub fn serialize(pages: &PageSet) -> String {
    collapse(pages)
        .iter()
        .map(PageRange::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Result of re-deriving a spec against a known page count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Canonical spec containing only existing pages
    pub spec: String,
    /// Pages that were dropped for exceeding the page count
    pub removed: PageSet,
}

impl Correction {
    pub fn has_removed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Rebuild `spec` from its in-range pages.
///
/// The original string is never edited in place; the corrected spec is always
/// `serialize(valid)`, so applying the correction again yields the same string.
pub fn auto_correct(spec: &str, page_count: u32) -> Correction {
    let PageValidation { valid, invalid } =
        validate_against_page_count(&parse(spec), page_count);
    if !invalid.is_empty() {
        tracing::debug!(
            page_count,
            removed = %serialize(&invalid),
            "Out-of-range pages removed from color spec"
        );
    }
    Correction {
        spec: serialize(&valid),
        removed: invalid,
    }
}
