//! Fail-open currency converter.
//!
//! Conversion never blocks the workflow: when the rate source is down or
//! does not know the target currency, the original amount is returned and
//! the result is flagged as degraded.

use std::sync::Arc;

use outlay_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::conversion::{AMOUNT_DECIMAL_PLACES, convert_amount};
use super::rates::RateSource;

/// Outcome of a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Conversion {
    /// Amount in the target currency (or the original amount when degraded).
    pub amount: Decimal,
    /// Rate applied; `1` for identity and degraded conversions.
    pub rate: Decimal,
    /// True when the lookup failed and the original amount was passed through.
    pub degraded: bool,
}

impl Conversion {
    fn identity(amount: Decimal) -> Self {
        Self {
            amount,
            rate: Decimal::ONE,
            degraded: false,
        }
    }

    fn degraded(amount: Decimal) -> Self {
        Self {
            amount,
            rate: Decimal::ONE,
            degraded: true,
        }
    }
}

/// Converts amounts between currencies through a [`RateSource`].
#[derive(Clone)]
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
}

impl std::fmt::Debug for CurrencyConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyConverter").finish_non_exhaustive()
    }
}

impl CurrencyConverter {
    /// Creates a converter over the given source.
    #[must_use]
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    /// Converts `amount` from `from` into `to`.
    ///
    /// Same-currency conversions return immediately without a lookup.
    pub async fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Conversion {
        if from == to {
            return Conversion::identity(amount);
        }

        let table = match self.source.rates(from).await {
            Ok(table) => table,
            Err(err) => {
                warn!(%from, %to, error = %err, "rate lookup failed, keeping original amount");
                return Conversion::degraded(amount);
            }
        };

        match table.get(to.as_str()) {
            Some(rate) if *rate > Decimal::ZERO => {
                let converted = convert_amount(amount, *rate, AMOUNT_DECIMAL_PLACES);
                debug!(%from, %to, %rate, %amount, %converted, "converted amount");
                Conversion {
                    amount: converted,
                    rate: *rate,
                    degraded: false,
                }
            }
            Some(rate) => {
                warn!(%from, %to, %rate, "rate source returned a non-positive rate, keeping original amount");
                Conversion::degraded(amount)
            }
            None => {
                warn!(%from, %to, "rate source has no rate for target, keeping original amount");
                Conversion::degraded(amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::currency::rates::{RateLookupError, RateTable, StaticRateSource};

    /// Counts lookups and always fails.
    #[derive(Default)]
    struct CountingFailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for CountingFailingSource {
        async fn rates(&self, _base: &CurrencyCode) -> Result<RateTable, RateLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RateLookupError::Unavailable("connection refused".to_string()))
        }
    }

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_same_currency_is_identity_without_lookup() {
        let source = Arc::new(CountingFailingSource::default());
        let converter = CurrencyConverter::new(source.clone());

        let result = converter.convert(dec!(100), &code("USD"), &code("USD")).await;

        assert_eq!(result.amount, dec!(100));
        assert!(!result.degraded);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_converts_with_published_rate() {
        let source = StaticRateSource::new().with_rate("EUR", "USD", dec!(1.08));
        let converter = CurrencyConverter::new(Arc::new(source));

        let result = converter.convert(dec!(50), &code("EUR"), &code("USD")).await;

        assert_eq!(result.amount, dec!(54.00));
        assert_eq!(result.rate, dec!(1.08));
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn test_source_failure_fails_open() {
        let source = Arc::new(CountingFailingSource::default());
        let converter = CurrencyConverter::new(source.clone());

        let result = converter.convert(dec!(75.5), &code("EUR"), &code("USD")).await;

        assert_eq!(result.amount, dec!(75.5));
        assert!(result.degraded);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_target_fails_open() {
        let source = StaticRateSource::new().with_rate("EUR", "GBP", dec!(0.86));
        let converter = CurrencyConverter::new(Arc::new(source));

        let result = converter.convert(dec!(20), &code("EUR"), &code("USD")).await;

        assert_eq!(result.amount, dec!(20));
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn test_zero_rate_fails_open() {
        let source = StaticRateSource::new().with_rate("EUR", "USD", Decimal::ZERO);
        let converter = CurrencyConverter::new(Arc::new(source));

        let result = converter.convert(dec!(20), &code("EUR"), &code("USD")).await;

        assert_eq!(result.amount, dec!(20));
        assert!(result.degraded);
    }
}
