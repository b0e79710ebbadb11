//! Conversion of invoice totals into the local currency.

#[cfg(feature = "http")]
mod frankfurter;

#[cfg(feature = "http")]
pub use frankfurter::FrankfurterRates;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RateLookupError;
use crate::invoice::rules::round_to_unit;
use crate::models::invoice::CurrencyCode;

/// An exchange-rate source: how many `to` units one `from` unit buys.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, RateLookupError>;
}

/// How a local total was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Already in the local currency; no lookup was made.
    SameCurrency,
    /// Multiplied by a looked-up rate.
    Converted { rate: Decimal },
    /// No usable rate; the value is the unconverted amount.
    Fallback { reason: RateLookupError },
}

/// A local-currency total, rounded to a whole unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub value: Decimal,
    pub outcome: ConversionOutcome,
}

impl Conversion {
    /// `value` as the integer string stored in `finalTotalAmount`.
    pub fn display_value(&self) -> String {
        self.value.to_string()
    }
}

/// Converts amounts to the local currency through a [`RateProvider`].
#[derive(Clone)]
pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
    local_currency: CurrencyCode,
    timeout: Duration,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>, local_currency: CurrencyCode, timeout: Duration) -> Self {
        Self {
            provider,
            local_currency,
            timeout,
        }
    }

    pub fn local_currency(&self) -> &CurrencyCode {
        &self.local_currency
    }

    /// Convert `amount` from `from` into the local currency.
    ///
    /// Never fails. A failed, timed-out or overflowing lookup returns the
    /// rounded original amount with a [`ConversionOutcome::Fallback`].
    pub async fn convert(&self, amount: Decimal, from: &CurrencyCode) -> Conversion {
        if *from == self.local_currency {
            return Conversion {
                value: round_to_unit(amount),
                outcome: ConversionOutcome::SameCurrency,
            };
        }

        let lookup = tokio::time::timeout(
            self.timeout,
            self.provider.rate(from, &self.local_currency),
        )
        .await
        .unwrap_or(Err(RateLookupError::Timeout(self.timeout.as_secs())));

        let converted = lookup.and_then(|rate| {
            amount
                .checked_mul(rate)
                .map(|product| (rate, product))
                .ok_or(RateLookupError::Overflow)
        });

        match converted {
            Ok((rate, product)) => {
                debug!(%from, to = %self.local_currency, %rate, "Converted total");
                Conversion {
                    value: round_to_unit(product),
                    outcome: ConversionOutcome::Converted { rate },
                }
            }
            Err(reason) => {
                warn!(%from, to = %self.local_currency, error = %reason, "No exchange rate, keeping original amount");
                Conversion {
                    value: round_to_unit(amount),
                    outcome: ConversionOutcome::Fallback { reason },
                }
            }
        }
    }

    /// Local-currency value of `amount`, falling back to the original amount.
    pub async fn to_local(&self, amount: Decimal, from: &CurrencyCode) -> Decimal {
        self.convert(amount, from).await.value
    }
}
