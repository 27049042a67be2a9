//! Currency conversion arithmetic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Always round to the amount's decimal places
//! - Use banker's rounding (round half to even)
//! - Store both original and converted amounts

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places kept on converted expense amounts.
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

/// Decimal places kept on the stored effective exchange rate.
pub const RATE_DECIMAL_PLACES: u32 = 6;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    let converted = amount * rate;
    converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Effective rate between an original amount and its converted value.
///
/// Returns `None` for a zero original amount.
#[must_use]
pub fn effective_rate(converted: Decimal, original: Decimal) -> Option<Decimal> {
    if original.is_zero() {
        return None;
    }
    Some(
        (converted / original)
            .round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_amount() {
        // 100 USD * 83.12 = 8312 INR
        let result = convert_amount(dec!(100), dec!(83.12), AMOUNT_DECIMAL_PLACES);
        assert_eq!(result, dec!(8312.00));
    }

    #[test]
    fn test_convert_with_rounding() {
        // 10.25 EUR * 1.0875 = 11.146875 -> 11.15
        let result = convert_amount(dec!(10.25), dec!(1.0875), AMOUNT_DECIMAL_PLACES);
        assert_eq!(result, dec!(11.15));
    }

    #[test]
    fn test_bankers_rounding() {
        assert_eq!(convert_amount(dec!(1), dec!(2.5), 0), dec!(2));
        assert_eq!(convert_amount(dec!(1), dec!(3.5), 0), dec!(4));
    }

    #[test]
    fn test_effective_rate() {
        assert_eq!(effective_rate(dec!(8312), dec!(100)), Some(dec!(83.12)));
        assert_eq!(effective_rate(dec!(1), dec!(3)), Some(dec!(0.333333)));
        assert_eq!(effective_rate(dec!(10), Decimal::ZERO), None);
    }
}
