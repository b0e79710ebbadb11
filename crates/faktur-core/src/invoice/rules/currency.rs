//! Currency code normalization.

use crate::models::invoice::CurrencyCode;

use super::FieldRule;
use super::patterns::CURRENCY_TOKEN;

/// Symbols and local abbreviations printed in place of a code.
const SYMBOLS: &[(&str, &str)] = &[
    ("RP", "IDR"),
    ("RP.", "IDR"),
    ("RUPIAH", "IDR"),
    ("$", "USD"),
    ("US$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("JP¥", "JPY"),
    ("S$", "SGD"),
    ("SG$", "SGD"),
    ("RM", "MYR"),
    ("A$", "AUD"),
    ("₹", "INR"),
];

/// Active ISO 4217 codes. Anything else that happens to be three letters
/// (`"NaN"`, `"not found"`) is not a currency.
const ISO_4217: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD", "BDT",
    "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BOV", "BRL", "BSD", "BTN", "BWP", "BYN", "BZD",
    "CAD", "CDF", "CHE", "CHF", "CHW", "CLF", "CLP", "CNY", "COP", "COU", "CRC", "CUC", "CUP",
    "CVE", "CZK", "DJF", "DKK", "DOP", "DZD", "EGP", "ERN", "ETB", "EUR", "FJD", "FKP", "GBP",
    "GEL", "GHS", "GIP", "GMD", "GNF", "GTQ", "GYD", "HKD", "HNL", "HTG", "HUF", "IDR", "ILS",
    "INR", "IQD", "IRR", "ISK", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KMF", "KPW", "KRW",
    "KWD", "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL", "LYD", "MAD", "MDL", "MGA", "MKD",
    "MMK", "MNT", "MOP", "MRU", "MUR", "MVR", "MWK", "MXN", "MXV", "MYR", "MZN", "NAD", "NGN",
    "NIO", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR",
    "RON", "RSD", "RUB", "RWF", "SAR", "SBD", "SCR", "SDG", "SEK", "SGD", "SHP", "SLE", "SLL",
    "SOS", "SRD", "SSP", "STN", "SVC", "SYP", "SZL", "THB", "TJS", "TMT", "TND", "TOP", "TRY",
    "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "USN", "UYI", "UYU", "UYW", "UZS", "VED", "VES",
    "VND", "VUV", "WST", "XAF", "XCD", "XCG", "XOF", "XPF", "YER", "ZAR", "ZMW", "ZWG", "ZWL",
];

fn known(code: &str) -> Option<CurrencyCode> {
    ISO_4217
        .contains(&code)
        .then(|| CurrencyCode::new(code))
        .flatten()
}

/// Currency field rule.
pub struct CurrencyRule;

impl CurrencyRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for CurrencyRule {
    type Output = CurrencyCode;

    fn normalize(&self, raw: &str) -> Option<Self::Output> {
        normalize_currency(raw)
    }
}

/// Read a currency code from extractor output.
///
/// Accepts known codes in any case, common symbols, and descriptions that
/// embed an uppercase code (`"USD (US Dollar)"`).
pub fn normalize_currency(raw: &str) -> Option<CurrencyCode> {
    let trimmed = raw.trim();
    let upper = trimmed.to_uppercase();

    if let Some(code) = known(&upper) {
        return Some(code);
    }

    if let Some((_, code)) = SYMBOLS.iter().find(|(symbol, _)| *symbol == upper) {
        return CurrencyCode::new(code);
    }

    CURRENCY_TOKEN
        .captures_iter(trimmed)
        .find_map(|caps| known(&caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> Option<String> {
        normalize_currency(raw).map(|c| c.to_string())
    }

    #[test]
    fn test_plain_codes() {
        assert_eq!(code("USD"), Some("USD".to_string()));
        assert_eq!(code(" idr "), Some("IDR".to_string()));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(code("Rp"), Some("IDR".to_string()));
        assert_eq!(code("$"), Some("USD".to_string()));
        assert_eq!(code("€"), Some("EUR".to_string()));
        assert_eq!(code("S$"), Some("SGD".to_string()));
    }

    #[test]
    fn test_embedded_code() {
        assert_eq!(code("USD (US Dollar)"), Some("USD".to_string()));
        assert_eq!(code("Total in EUR"), Some("EUR".to_string()));
    }

    #[test]
    fn test_words_are_not_codes() {
        assert_eq!(code("not found"), None);
        assert_eq!(code("unknown yet"), None);
        assert_eq!(code("N/A yet"), None);
        assert_eq!(code("NaN"), None);
        assert_eq!(code("NOT GIVEN"), None);
        assert_eq!(code("XYZ"), None);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(code(""), None);
        assert_eq!(code("dollars"), None);
        assert_eq!(code("US"), None);
    }
}
