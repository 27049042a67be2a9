//! Multi-currency handling and exchange rates.
//!
//! # Modules
//!
//! - `conversion` - Decimal conversion arithmetic with banker's rounding
//! - `rates` - The `RateSource` trait and a static source
//! - `http` - Rate source backed by an exchange rate HTTP API
//! - `converter` - Fail-open converter used by the workflow initializer

pub mod conversion;
pub mod converter;
pub mod http;
pub mod rates;

#[cfg(test)]
mod props;

pub use conversion::{convert_amount, effective_rate};
pub use converter::{Conversion, CurrencyConverter};
pub use http::HttpRateSource;
pub use rates::{RateLookupError, RateSource, RateTable, StaticRateSource};
