//! Store-scoped unit price table

use serde::{Deserialize, Deserializer, Serialize};

use super::file_spec::{BindingType, PrintMode, SpecialPaper};

/// Per-page unit prices for one color mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidedPrices {
    /// Price per page, single-sided
    pub single: f64,
    /// Price per page, double-sided
    pub double: f64,
}

impl SidedPrices {
    pub fn for_duplex(&self, duplex: bool) -> f64 {
        if duplex { self.double } else { self.single }
    }
}

/// Stored form of [`SidedPrices`]; either side may be omitted
#[derive(Deserialize)]
struct PartialSided {
    single: Option<f64>,
    double: Option<f64>,
}

impl PartialSided {
    fn or(self, fallback: SidedPrices) -> SidedPrices {
        SidedPrices {
            single: self.single.unwrap_or(fallback.single),
            double: self.double.unwrap_or(fallback.double),
        }
    }
}

fn bw_prices<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SidedPrices, D::Error> {
    Ok(PartialSided::deserialize(deserializer)?.or(PricingTable::DEFAULT.bw))
}

fn color_prices<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SidedPrices, D::Error> {
    Ok(PartialSided::deserialize(deserializer)?.or(PricingTable::DEFAULT.color))
}

/// Per-page paper surcharges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperPrices {
    pub glossy: f64,
    pub matte: f64,
    pub transparent: f64,
}

impl Default for PaperPrices {
    fn default() -> Self {
        PricingTable::DEFAULT.paper
    }
}

/// Per-document binding surcharges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingPrices {
    pub spiral: f64,
    pub staple: f64,
    pub hardcover: f64,
}

impl Default for BindingPrices {
    fn default() -> Self {
        PricingTable::DEFAULT.binding
    }
}

/// 价格表 (按门店配置, 缺省使用内置默认表)
///
/// Missing fields in a stored table fall back to the default value for that field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTable {
    #[serde(deserialize_with = "bw_prices")]
    pub bw: SidedPrices,
    #[serde(deserialize_with = "color_prices")]
    pub color: SidedPrices,
    pub paper: PaperPrices,
    pub binding: BindingPrices,
}

impl PricingTable {
    /// Built-in table used when a store has none configured
    pub const DEFAULT: PricingTable = PricingTable {
        bw: SidedPrices {
            single: 2.0,
            double: 3.0,
        },
        color: SidedPrices {
            single: 5.0,
            double: 8.0,
        },
        paper: PaperPrices {
            glossy: 3.0,
            matte: 2.0,
            transparent: 5.0,
        },
        binding: BindingPrices {
            spiral: 25.0,
            staple: 5.0,
            hardcover: 80.0,
        },
    };

    /// Per-page unit for a non-mixed mode. Mixed files are priced per page
    /// class, so `Mixed` resolves to the black-and-white unit here.
    pub fn page_unit(&self, mode: PrintMode, duplex: bool) -> f64 {
        match mode {
            PrintMode::Color => self.color.for_duplex(duplex),
            PrintMode::BlackAndWhite | PrintMode::Mixed => self.bw.for_duplex(duplex),
        }
    }

    /// Per-page paper surcharge (0 for plain paper)
    pub fn paper_unit(&self, paper: SpecialPaper) -> f64 {
        match paper {
            SpecialPaper::None => 0.0,
            SpecialPaper::Glossy => self.paper.glossy,
            SpecialPaper::Matte => self.paper.matte,
            SpecialPaper::Transparent => self.paper.transparent,
        }
    }

    /// Per-document binding surcharge (0 for no binding)
    pub fn binding_price(&self, binding: BindingType) -> f64 {
        match binding {
            BindingType::None => 0.0,
            BindingType::Spiral => self.binding.spiral,
            BindingType::Staple => self.binding.staple,
            BindingType::Hardcover => self.binding.hardcover,
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_values() {
        let table = PricingTable::default();
        assert_eq!(table.page_unit(PrintMode::BlackAndWhite, false), 2.0);
        assert_eq!(table.page_unit(PrintMode::Color, false), 5.0);
        assert_eq!(table.page_unit(PrintMode::Color, true), 8.0);
        assert_eq!(table.paper_unit(SpecialPaper::None), 0.0);
        assert_eq!(table.binding_price(BindingType::Spiral), 25.0);
    }

    #[test]
    fn test_partial_table_fills_missing_fields() {
        let json = r#"{ "color": { "single": 6.5, "double": 9 }, "binding": { "spiral": 30 } }"#;
        let table: PricingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.color.single, 6.5);
        assert_eq!(table.bw, PricingTable::DEFAULT.bw);
        assert_eq!(table.binding.spiral, 30.0);
        assert_eq!(table.binding.hardcover, 80.0);
        assert_eq!(table.paper, PricingTable::DEFAULT.paper);
    }

    #[test]
    fn test_partial_sides_use_their_own_mode_defaults() {
        let json = r#"{ "bw": { "double": 2.5 }, "color": { "single": 4 } }"#;
        let table: PricingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.bw, SidedPrices { single: 2.0, double: 2.5 });
        assert_eq!(table.color, SidedPrices { single: 4.0, double: 8.0 });
    }
}
