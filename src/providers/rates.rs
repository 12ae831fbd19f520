//! Exchange-rate providers
//!
//! `FrankfurterClient` talks to the free frankfurter.app API (no key
//! required). `MockRates` is the internal fallback table the currency
//! handler escalates to when the live tier reports an error.

use crate::error::AgentError;
use crate::models::{CurrencyConversion, ExchangeRate};
use crate::providers::LiveRateProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const LIVE_SOURCE: &str = "frankfurter.app (live)";

/// Bound on every external rate lookup; a timeout surfaces as a provider
/// error for the affected intent only.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FrankfurterClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    rates: HashMap<String, f64>,
    date: String,
}

impl FrankfurterClient {
    pub fn new(base_url: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn latest(&self, query: &[(&str, String)]) -> crate::Result<FrankfurterResponse> {
        let url = format!("{}/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("Live rate request failed: {}", e);
                AgentError::ProviderError(format!("Failed to fetch exchange rate: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AgentError::ProviderError(format!(
                "Exchange rate API returned {}",
                response.status()
            )));
        }

        response.json::<FrankfurterResponse>().await.map_err(|e| {
            AgentError::ProviderError(format!("Invalid exchange rate response: {}", e))
        })
    }
}

#[async_trait]
impl LiveRateProvider for FrankfurterClient {
    async fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> crate::Result<CurrencyConversion> {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        debug!(amount, %from, %to, "Live conversion");

        let data = self
            .latest(&[
                ("amount", amount.to_string()),
                ("from", from.clone()),
                ("to", to.clone()),
            ])
            .await?;

        let converted = data.rates.get(&to).copied().ok_or_else(|| {
            AgentError::ProviderError(format!("No live rate for {} to {}", from, to))
        })?;

        Ok(CurrencyConversion {
            amount,
            from_currency: from,
            to_currency: to,
            converted_amount: converted,
            rate: None,
            date: Some(data.date),
            source: LIVE_SOURCE.to_string(),
        })
    }

    async fn rate(&self, from_currency: &str, to_currency: &str) -> crate::Result<ExchangeRate> {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        let data = self
            .latest(&[("from", from.clone()), ("to", to.clone())])
            .await?;

        let rate = data.rates.get(&to).copied().ok_or_else(|| {
            AgentError::ProviderError(format!("No live rate for {} to {}", from, to))
        })?;

        Ok(ExchangeRate {
            from_currency: from,
            to_currency: to,
            rate,
            date: data.date,
        })
    }
}

/// Internal fixed-rate table. Also serves the internal convert-currency
/// endpoint directly.
pub struct MockRates {
    rates: HashMap<(String, String), f64>,
}

impl MockRates {
    pub fn new() -> Self {
        let mut rates = HashMap::new();
        rates.insert(("USD".to_string(), "BDT".to_string()), 120.5);
        rates.insert(("USD".to_string(), "EUR".to_string()), 0.92);

        Self { rates }
    }

    pub fn with_rates(pairs: impl IntoIterator<Item = ((String, String), f64)>) -> Self {
        Self {
            rates: pairs.into_iter().collect(),
        }
    }

    pub fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> crate::Result<CurrencyConversion> {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        let rate = self
            .rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| {
                AgentError::ProviderError(format!("Rate not available for {} to {}", from, to))
            })?;

        Ok(CurrencyConversion {
            amount,
            from_currency: from,
            to_currency: to,
            converted_amount: amount * rate,
            rate: Some(rate),
            date: None,
            source: "internal".to_string(),
        })
    }
}

impl Default for MockRates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_conversion() {
        let rates = MockRates::new();
        let conversion = rates.convert(100.0, "USD", "EUR").unwrap();

        assert_eq!(conversion.converted_amount, 92.0);
        assert_eq!(conversion.rate, Some(0.92));
        assert_eq!(conversion.from_currency, "USD");
        assert_eq!(conversion.to_currency, "EUR");
    }

    #[test]
    fn test_mock_conversion_normalizes_case() {
        let rates = MockRates::new();
        let conversion = rates.convert(2.0, "usd", "bdt").unwrap();

        assert_eq!(conversion.converted_amount, 241.0);
        assert_eq!(conversion.to_currency, "BDT");
    }

    #[test]
    fn test_mock_missing_rate() {
        let rates = MockRates::new();
        let result = rates.convert(5.0, "EUR", "JPY");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Rate not available for EUR to JPY"));
    }

    #[test]
    fn test_frankfurter_response_shape() {
        let raw = r#"{"amount": 100.0, "base": "USD", "date": "2025-06-01",
                      "rates": {"EUR": 92.0}}"#;
        let parsed: FrankfurterResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.rates.get("EUR"), Some(&92.0));
        assert_eq!(parsed.date, "2025-06-01");
    }
}
