//! Exchange rate sources.
//!
//! A rate source answers "how much of each target currency is one unit of
//! the base currency worth". Sources are treated as unreliable: the
//! converter absorbs every [`RateLookupError`].

use std::collections::HashMap;

use async_trait::async_trait;
use outlay_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use thiserror::Error;

/// Rates keyed by target currency code, relative to one unit of a base currency.
pub type RateTable = HashMap<String, Decimal>;

/// Errors raised by a rate source.
#[derive(Debug, Error)]
pub enum RateLookupError {
    /// The source could not be reached or timed out.
    #[error("Rate source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something that is not a rate table.
    #[error("Malformed rate response: {0}")]
    Malformed(String),

    /// The source has no rates for this base currency.
    #[error("No rates published for base currency {0}")]
    UnknownBase(String),
}

/// Provider of exchange rate tables.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches every published rate for `base`.
    async fn rates(&self, base: &CurrencyCode) -> Result<RateTable, RateLookupError>;
}

/// Fixed in-memory rate tables.
///
/// Used by tests and scenario replays where no network is wanted.
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    tables: HashMap<String, RateTable>,
}

impl StaticRateSource {
    /// Creates an empty source; every lookup fails with `UnknownBase`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the rate from `base` to `target`.
    #[must_use]
    pub fn with_rate(mut self, base: &str, target: &str, rate: Decimal) -> Self {
        self.tables
            .entry(base.to_ascii_uppercase())
            .or_default()
            .insert(target.to_ascii_uppercase(), rate);
        self
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn rates(&self, base: &CurrencyCode) -> Result<RateTable, RateLookupError> {
        self.tables
            .get(base.as_str())
            .cloned()
            .ok_or_else(|| RateLookupError::UnknownBase(base.to_string()))
    }
}
