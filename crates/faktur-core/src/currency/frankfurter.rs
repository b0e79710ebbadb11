//! Frankfurter exchange-rate client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use super::RateProvider;
use crate::error::RateLookupError;
use crate::models::config::RatesConfig;
use crate::models::invoice::CurrencyCode;

/// Latest rates from a Frankfurter-compatible service.
pub struct FrankfurterRates {
    client: Client,
    base_url: String,
}

impl FrankfurterRates {
    pub fn new(config: &RatesConfig) -> Result<Self, RateLookupError> {
        let client = Client::builder()
            .user_agent(concat!("faktur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RateLookupError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for FrankfurterRates {
    async fn rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, RateLookupError> {
        let url = format!("{}/latest", self.base_url);
        debug!(%from, %to, "Looking up exchange rate");

        let response = self
            .client
            .get(&url)
            .query(&[("base", from.as_str()), ("symbols", to.as_str())])
            .send()
            .await
            .map_err(|e| RateLookupError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(unknown_pair(from, to));
            }
            status => return Err(RateLookupError::Http(status.as_u16())),
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RateLookupError::MalformedResponse(e.to_string()))?;

        read_rate(&body, from, to)
    }
}

fn unknown_pair(from: &CurrencyCode, to: &CurrencyCode) -> RateLookupError {
    RateLookupError::UnknownPair {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Read `rates.<to>` from a `/latest` response as a positive decimal.
fn read_rate(body: &Value, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, RateLookupError> {
    let rate = match body.get("rates").and_then(|rates| rates.get(to.as_str())) {
        Some(Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|_| RateLookupError::MalformedResponse(format!("rate {text} out of range")))?
        }
        Some(other) => {
            return Err(RateLookupError::MalformedResponse(format!(
                "rate is not a number: {other}"
            )));
        }
        None => return Err(unknown_pair(from, to)),
    };

    if rate <= Decimal::ZERO {
        return Err(RateLookupError::MalformedResponse(format!(
            "non-positive rate {rate}"
        )));
    }

    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_read_rate() {
        let body = json!({"amount": 1.0, "base": "USD", "date": "2025-01-31", "rates": {"IDR": 16312}});
        assert_eq!(read_rate(&body, &code("USD"), &code("IDR")), Ok(Decimal::from(16312)));

        let body = json!({"rates": {"EUR": 0.92}});
        assert_eq!(
            read_rate(&body, &code("USD"), &code("EUR")),
            Ok(Decimal::from_str("0.92").unwrap())
        );
    }

    #[test]
    fn test_missing_symbol_is_unknown_pair() {
        let body = json!({"rates": {}});
        assert_eq!(
            read_rate(&body, &code("USD"), &code("IDR")),
            Err(RateLookupError::UnknownPair {
                from: "USD".to_string(),
                to: "IDR".to_string()
            })
        );
    }

    #[test]
    fn test_bad_rate_values() {
        for rates in [json!({"IDR": "16312"}), json!({"IDR": 0}), json!({"IDR": -1.5})] {
            let body = json!({ "rates": rates });
            assert!(matches!(
                read_rate(&body, &code("USD"), &code("IDR")),
                Err(RateLookupError::MalformedResponse(_))
            ));
        }
    }
}
