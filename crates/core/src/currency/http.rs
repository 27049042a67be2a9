//! HTTP exchange rate source.
//!
//! Talks to an exchangerate-api style endpoint: `GET {base_url}/{BASE}`
//! answering `{"base": "USD", "rates": {"EUR": 0.92, ...}}`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use outlay_shared::config::RatesConfig;
use outlay_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::rates::{RateLookupError, RateSource, RateTable};

/// Wire shape of a rate API response.
#[derive(Debug, Deserialize)]
pub struct RateResponse {
    /// Base currency the rates are relative to.
    #[serde(default)]
    pub base: Option<String>,
    /// Target currency code to rate.
    #[serde(default)]
    pub rates: Option<HashMap<String, Decimal>>,
}

impl RateResponse {
    /// Validates the response against the requested base and extracts the table.
    pub fn into_table(self, requested: &CurrencyCode) -> Result<RateTable, RateLookupError> {
        if let Some(base) = &self.base
            && !base.eq_ignore_ascii_case(requested.as_str())
        {
            return Err(RateLookupError::Malformed(format!(
                "asked for {requested}, got rates for {base}"
            )));
        }

        let rates = self
            .rates
            .ok_or_else(|| RateLookupError::UnknownBase(requested.to_string()))?;

        Ok(rates
            .into_iter()
            .map(|(code, rate)| (code.to_ascii_uppercase(), rate))
            .collect())
    }
}

/// Rate source backed by a public HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateSource {
    /// Builds a source from configuration.
    pub fn new(config: &RatesConfig) -> Result<Self, RateLookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RateLookupError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, base: &CurrencyCode) -> String {
        format!("{}/{}", self.base_url, base)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn rates(&self, base: &CurrencyCode) -> Result<RateTable, RateLookupError> {
        let response = self
            .client
            .get(self.url_for(base))
            .send()
            .await
            .map_err(|e| RateLookupError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateLookupError::Unavailable(format!(
                "rate API answered {}",
                response.status()
            )));
        }

        let body: RateResponse = response
            .json()
            .await
            .map_err(|e| RateLookupError::Malformed(e.to_string()))?;

        body.into_table(base)
    }
}
