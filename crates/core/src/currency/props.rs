//! Property-based tests for currency operations.
//!
//! - Banker's rounding keeps converted amounts at two decimal places
//! - Same-currency conversion is the identity
//! - Failed lookups never alter the amount

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::conversion::{AMOUNT_DECIMAL_PLACES, convert_amount, effective_rate};
use super::converter::CurrencyConverter;
use super::rates::StaticRateSource;

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converted amounts never carry more than two decimal places.
    #[test]
    fn prop_convert_rounds_to_amount_places(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let result = convert_amount(amount, rate, AMOUNT_DECIMAL_PLACES);
        prop_assert!(result.scale() <= AMOUNT_DECIMAL_PLACES);
    }

    /// Rounding moves the exact product by at most half a cent.
    #[test]
    fn prop_convert_error_is_bounded(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let exact = amount * rate;
        let result = convert_amount(amount, rate, AMOUNT_DECIMAL_PLACES);
        prop_assert!((exact - result).abs() <= Decimal::new(5, 3));
    }

    /// The effective rate of an unconverted amount is exactly one.
    #[test]
    fn prop_effective_rate_of_identity_is_one(amount in positive_amount()) {
        prop_assert_eq!(effective_rate(amount, amount), Some(Decimal::ONE));
    }

    /// Same-currency conversion returns the input untouched.
    #[test]
    fn prop_same_currency_is_identity(amount in positive_amount()) {
        let converter = CurrencyConverter::new(Arc::new(StaticRateSource::new()));
        let usd = "USD".parse().unwrap();
        let result = block_on(converter.convert(amount, &usd, &usd));
        prop_assert_eq!(result.amount, amount);
        prop_assert!(!result.degraded);
    }

    /// A lookup that cannot be answered passes the amount through.
    #[test]
    fn prop_failed_lookup_keeps_amount(amount in positive_amount()) {
        let converter = CurrencyConverter::new(Arc::new(StaticRateSource::new()));
        let result = block_on(converter.convert(
            amount,
            &"EUR".parse().unwrap(),
            &"USD".parse().unwrap(),
        ));
        prop_assert_eq!(result.amount, amount);
        prop_assert!(result.degraded);
    }
}
