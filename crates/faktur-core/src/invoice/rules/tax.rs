//! Tax percentage normalization.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::FieldRule;
use super::patterns::{BARE_NUMBER, PERCENTAGE, TAX_SHAPE};

/// Tax field rule.
pub struct TaxRule;

impl TaxRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TaxRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for TaxRule {
    type Output = String;

    fn normalize(&self, raw: &str) -> Option<Self::Output> {
        normalize_tax(raw)
    }
}

/// Normalize a tax description to a single `"N%"` value.
///
/// Several percentages in one value (one per tax line) are summed into one
/// combined rate. A bare number is read as a percentage. Anything without a
/// usable rate, or above 100%, yields `None`.
pub fn normalize_tax(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let rates: Vec<Decimal> = PERCENTAGE
        .captures_iter(raw)
        .filter_map(|caps| parse_rate(&caps[1]))
        .collect();

    let combined = if !rates.is_empty() {
        rates.iter().sum()
    } else if BARE_NUMBER.is_match(raw) {
        parse_rate(raw)?
    } else {
        return None;
    };

    if combined > Decimal::ONE_HUNDRED {
        return None;
    }

    let formatted = format!("{}%", combined.normalize());
    TAX_SHAPE.is_match(&formatted).then_some(formatted)
}

fn parse_rate(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.replace(',', ".")).ok()
}
