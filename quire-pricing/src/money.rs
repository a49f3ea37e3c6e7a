//! Decimal helpers for monetary values
//!
//! Table prices are stored as f64; all arithmetic happens in `Decimal` and the
//! result is rounded back to 2 places at the boundary.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Convert a table price to Decimal.
///
/// NaN, infinities and negative prices are misconfigured tables, not
/// discounts: they price as zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    match Decimal::from_f64(value) {
        Some(price) if price >= Decimal::ZERO => price,
        _ => {
            tracing::warn!(value = ?value, "Invalid unit price in pricing table, treating as zero");
            Decimal::ZERO
        }
    }
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_prices_are_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
        assert_eq!(to_decimal(-3.0), Decimal::ZERO);
        assert_eq!(to_decimal(2.5), Decimal::new(25, 1));
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(to_f64(Decimal::new(1005, 3)), 1.01);
        assert_eq!(to_f64(Decimal::new(1004, 3)), 1.0);
        // 0.1 + 0.2 stays exact
        assert_eq!(to_f64(to_decimal(0.1) + to_decimal(0.2)), 0.3);
    }
}
