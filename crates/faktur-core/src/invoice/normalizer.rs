//! Field normalization: loosely-typed extractor output to the canonical record.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::error::{AmountError, EditError};
use crate::models::invoice::{
    CurrencyCode, NormalizedInvoiceFields, RawExtractionResult, ReviewFlag, TEXT_FIELDS,
};

use super::rules::{
    format_amount, parse_amount, round_to_unit, CurrencyRule, DateRule, FieldRule, TaxRule,
    TextRule,
};

/// Result of normalizing one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedExtraction {
    pub fields: NormalizedInvoiceFields,
    /// Parsed total in the original currency, when one was readable.
    pub total: Option<Decimal>,
    pub flags: Vec<ReviewFlag>,
}

/// Applies the per-field rules to a [`RawExtractionResult`].
///
/// Missing keys, `null`, non-text values and placeholder markers all become
/// null fields; nothing here fails.
pub struct FieldNormalizer {
    local_currency: CurrencyCode,
    text: TextRule,
    date: DateRule,
    tax: TaxRule,
    currency: CurrencyRule,
}

impl FieldNormalizer {
    pub fn new(local_currency: CurrencyCode) -> Self {
        Self {
            local_currency,
            text: TextRule::new(),
            date: DateRule::new(),
            tax: TaxRule::new(),
            currency: CurrencyRule::new(),
        }
    }

    pub fn local_currency(&self) -> &CurrencyCode {
        &self.local_currency
    }

    /// Normalize every field. Classification and conversion happen later,
    /// so `invoiceType` is left at its default and `finalTotalAmount` null.
    pub fn normalize(&self, raw: &RawExtractionResult) -> NormalizedExtraction {
        let mut flags = Vec::new();

        let raw_currency = lookup_text(raw, "currencyCode");
        let currency_code = match self.currency.normalize_opt(raw_currency.as_deref()) {
            Some(code) => code,
            None => {
                debug!("Currency {:?} not recognized, assuming {}", raw_currency, self.local_currency);
                flags.push(ReviewFlag::CurrencyDefaulted {
                    raw: raw_currency.filter(|s| !s.trim().is_empty()),
                });
                self.local_currency.clone()
            }
        };

        let mut fields = NormalizedInvoiceFields::empty(currency_code);

        for key in TEXT_FIELDS {
            let value = self.text.normalize_opt(lookup_text(raw, key).as_deref());
            if let Some(slot) = fields.text_field_mut(key) {
                *slot = value;
            }
        }

        fields.invoice_date = self.date.normalize_opt(lookup_text(raw, "invoiceDate").as_deref());
        fields.due_date = self.date.normalize_opt(lookup_text(raw, "dueDate").as_deref());
        fields.tax_details = self.tax.normalize_opt(lookup_text(raw, "taxDetails").as_deref());

        let total = match self.read_total(raw, &fields.currency_code) {
            Some(Ok(amount)) => {
                fields.total_amount =
                    Some(format_amount(amount, &fields.currency_code, &self.local_currency));
                Some(amount)
            }
            Some(Err(AmountError::InvalidAmount { raw, reason })) => {
                debug!("Total amount {:?} rejected: {}", raw, reason);
                flags.push(ReviewFlag::InvalidAmount { raw });
                None
            }
            None => None,
        };

        NormalizedExtraction {
            fields,
            total,
            flags,
        }
    }

    /// JSON numbers are taken at face value; strings go through the
    /// separator heuristics of the invoice's currency.
    fn read_total(
        &self,
        raw: &RawExtractionResult,
        currency: &CurrencyCode,
    ) -> Option<Result<Decimal, AmountError>> {
        match lookup(raw, "totalAmount")? {
            Value::Number(n) => {
                let text = n.to_string();
                let parsed = Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map_err(|_| AmountError::InvalidAmount {
                        raw: text.clone(),
                        reason: "number out of range",
                    });
                Some(parsed)
            }
            Value::String(s) => {
                let text = self.text.normalize(s)?;
                Some(parse_amount(&text, currency, &self.local_currency))
            }
            _ => None,
        }
    }

    /// Apply a manual correction to one field, normalizing the value the same
    /// way extracted values are. `None` or a blank value clears the field.
    ///
    /// Changing `totalAmount` or `currencyCode` leaves `finalTotalAmount`
    /// stale; callers re-run conversion afterwards.
    pub fn apply_edit(
        &self,
        fields: &mut NormalizedInvoiceFields,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), EditError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let invalid = |v: &str| EditError::InvalidValue {
            field: key.to_string(),
            value: v.to_string(),
        };

        if let Some(slot) = fields.text_field_mut(key) {
            *slot = self.text.normalize_opt(value);
            return Ok(());
        }

        match key {
            "invoiceDate" | "dueDate" => {
                let date = match value {
                    Some(v) => Some(self.date.normalize(v).ok_or_else(|| invalid(v))?),
                    None => None,
                };
                if key == "invoiceDate" {
                    fields.invoice_date = date;
                } else {
                    fields.due_date = date;
                }
            }
            "taxDetails" => {
                fields.tax_details = match value {
                    Some(v) => Some(self.tax.normalize(v).ok_or_else(|| invalid(v))?),
                    None => None,
                };
            }
            "totalAmount" => {
                fields.total_amount = match value {
                    Some(v) => {
                        let amount = parse_amount(v, &fields.currency_code, &self.local_currency)
                            .map_err(|_| invalid(v))?;
                        Some(format_amount(amount, &fields.currency_code, &self.local_currency))
                    }
                    None => None,
                };
            }
            "finalTotalAmount" => {
                fields.final_total_amount = match value {
                    Some(v) => {
                        let amount = parse_amount(v, &self.local_currency, &self.local_currency)
                            .map_err(|_| invalid(v))?;
                        Some(round_to_unit(amount).to_string())
                    }
                    None => None,
                };
            }
            "currencyCode" => {
                let v = value.ok_or_else(|| invalid(""))?;
                let code = self.currency.normalize(v).ok_or_else(|| invalid(v))?;
                // The stored total was formatted for the old currency.
                let total = match fields.total_amount.as_deref() {
                    Some(total) => {
                        let amount = parse_amount(total, &fields.currency_code, &self.local_currency)
                            .map_err(|_| invalid(total))?;
                        Some(format_amount(amount, &code, &self.local_currency))
                    }
                    None => None,
                };
                fields.total_amount = total;
                fields.currency_code = code;
            }
            "invoiceType" => {
                let v = value.ok_or_else(|| invalid(""))?;
                fields.invoice_type = v.parse().map_err(|_| invalid(v))?;
            }
            _ => return Err(EditError::UnknownField(key.to_string())),
        }

        Ok(())
    }
}

/// Read a total that was already normalized and stored.
pub fn stored_total(fields: &NormalizedInvoiceFields, local: &CurrencyCode) -> Option<Decimal> {
    let total = fields.total_amount.as_deref()?;
    parse_amount(total, &fields.currency_code, local).ok()
}

/// Look a key up, accepting the snake_case spelling some models emit.
fn lookup<'a>(raw: &'a RawExtractionResult, key: &str) -> Option<&'a Value> {
    raw.get(key).or_else(|| raw.get(&to_snake_case(key)))
}

/// Strings as-is, numbers in their JSON text form; anything else is missing.
fn lookup_text(raw: &RawExtractionResult, key: &str) -> Option<String> {
    match lookup(raw, key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::InvoiceType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: Value) -> RawExtractionResult {
        match value {
            Value::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    fn normalizer() -> FieldNormalizer {
        FieldNormalizer::new(CurrencyCode::idr())
    }

    #[test]
    fn test_full_extraction() {
        let out = normalizer().normalize(&raw(json!({
            "sellerName": "  PT Sumber Makmur ",
            "sellerAddress": "Jl. Sudirman 1\nJakarta",
            "sellerEmail": "null",
            "buyerName": "Acme Corp",
            "invoiceNumber": "INV-001",
            "invoiceDate": "1/2/2025",
            "dueDate": "2025-03-01",
            "taxDetails": "PPN 11%",
            "totalAmount": "Rp 1.000.000",
            "currencyCode": "Rp"
        })));

        let f = &out.fields;
        assert_eq!(f.seller_name.as_deref(), Some("PT Sumber Makmur"));
        assert_eq!(f.seller_address.as_deref(), Some("Jl. Sudirman 1, Jakarta"));
        assert_eq!(f.seller_email, None);
        assert_eq!(f.invoice_date.as_deref(), Some("01/02/2025"));
        assert_eq!(f.due_date.as_deref(), Some("01/03/2025"));
        assert_eq!(f.tax_details.as_deref(), Some("11%"));
        assert_eq!(f.total_amount.as_deref(), Some("1.000.000,00"));
        assert_eq!(f.currency_code.as_str(), "IDR");
        assert_eq!(f.final_total_amount, None);
        assert_eq!(out.total, Some(Decimal::from(1_000_000)));
        assert!(out.flags.is_empty());
    }

    #[test]
    fn test_missing_and_non_text_values_are_null() {
        let out = normalizer().normalize(&raw(json!({
            "sellerName": null,
            "buyerName": ["Acme"],
            "invoiceNumber": 1042,
            "dueDate": {"day": 1},
            "currencyCode": "USD"
        })));

        assert_eq!(out.fields.seller_name, None);
        assert_eq!(out.fields.buyer_name, None);
        assert_eq!(out.fields.invoice_number.as_deref(), Some("1042"));
        assert_eq!(out.fields.due_date, None);
        assert_eq!(out.fields.total_amount, None);
        assert_eq!(out.total, None);
        assert!(out.flags.is_empty());
    }

    #[test]
    fn test_unrecognized_currency_defaults_to_local() {
        let out = normalizer().normalize(&raw(json!({"currencyCode": "dollars?"})));
        assert_eq!(out.fields.currency_code, CurrencyCode::idr());
        assert_eq!(
            out.flags,
            vec![ReviewFlag::CurrencyDefaulted {
                raw: Some("dollars?".to_string())
            }]
        );

        let out = normalizer().normalize(&RawExtractionResult::new());
        assert_eq!(out.flags, vec![ReviewFlag::CurrencyDefaulted { raw: None }]);

        for placeholder in ["not found", "unknown yet", "NaN"] {
            let out = normalizer().normalize(&raw(json!({
                "totalAmount": "150.000",
                "currencyCode": placeholder
            })));
            assert_eq!(out.fields.currency_code, CurrencyCode::idr(), "{placeholder}");
            assert_eq!(
                out.flags,
                vec![ReviewFlag::CurrencyDefaulted {
                    raw: Some(placeholder.to_string())
                }]
            );
        }
    }

    #[test]
    fn test_invalid_amount_is_flagged() {
        let out = normalizer().normalize(&raw(json!({
            "totalAmount": "see attached",
            "currencyCode": "IDR"
        })));
        assert_eq!(out.fields.total_amount, None);
        assert_eq!(out.total, None);
        assert!(matches!(out.flags.as_slice(), [ReviewFlag::InvalidAmount { .. }]));
    }

    #[test]
    fn test_numeric_total_is_taken_literally() {
        let out = normalizer().normalize(&raw(json!({
            "totalAmount": 1.234,
            "currencyCode": "USD"
        })));
        assert_eq!(out.total, Some(Decimal::from_str("1.234").unwrap()));
        assert_eq!(out.fields.total_amount.as_deref(), Some("1.2340"));
        assert_eq!(stored_total(&out.fields, &CurrencyCode::idr()), out.total);
    }

    #[test]
    fn test_foreign_total_uses_standard_format() {
        let out = normalizer().normalize(&raw(json!({
            "totalAmount": "USD 9,999,999.99",
            "currencyCode": "USD"
        })));
        assert_eq!(out.total, Some(Decimal::from_str("9999999.99").unwrap()));
        assert_eq!(out.fields.total_amount.as_deref(), Some("9,999,999.99"));
    }

    #[test]
    fn test_snake_case_keys_are_accepted() {
        let out = normalizer().normalize(&raw(json!({
            "seller_name": "Acme Corp",
            "invoice_number": "A-1",
            "currency_code": "EUR"
        })));
        assert_eq!(out.fields.seller_name.as_deref(), Some("Acme Corp"));
        assert_eq!(out.fields.invoice_number.as_deref(), Some("A-1"));
        assert_eq!(out.fields.currency_code.as_str(), "EUR");
    }

    #[test]
    fn test_apply_edit_normalizes_values() {
        let n = normalizer();
        let mut fields = NormalizedInvoiceFields::empty(CurrencyCode::idr());

        n.apply_edit(&mut fields, "sellerName", Some(" Acme ")).unwrap();
        n.apply_edit(&mut fields, "invoiceDate", Some("2025-12-31")).unwrap();
        n.apply_edit(&mut fields, "taxDetails", Some("11")).unwrap();
        n.apply_edit(&mut fields, "totalAmount", Some("2.500.000")).unwrap();
        n.apply_edit(&mut fields, "invoiceType", Some("outgoing")).unwrap();

        assert_eq!(fields.seller_name.as_deref(), Some("Acme"));
        assert_eq!(fields.invoice_date.as_deref(), Some("31/12/2025"));
        assert_eq!(fields.tax_details.as_deref(), Some("11%"));
        assert_eq!(fields.total_amount.as_deref(), Some("2.500.000,00"));
        assert_eq!(fields.invoice_type, InvoiceType::Outgoing);

        n.apply_edit(&mut fields, "sellerName", None).unwrap();
        assert_eq!(fields.seller_name, None);
    }

    #[test]
    fn test_apply_edit_rejects_bad_input() {
        let n = normalizer();
        let mut fields = NormalizedInvoiceFields::empty(CurrencyCode::idr());

        assert_eq!(
            n.apply_edit(&mut fields, "invoiceDate", Some("31/02/2025")),
            Err(EditError::InvalidValue {
                field: "invoiceDate".to_string(),
                value: "31/02/2025".to_string()
            })
        );
        assert_eq!(
            n.apply_edit(&mut fields, "originalCurrencyCode", Some("USD")),
            Err(EditError::UnknownField("originalCurrencyCode".to_string()))
        );
        assert!(n.apply_edit(&mut fields, "currencyCode", Some("??")).is_err());
    }

    #[test]
    fn test_currency_edit_reformats_total() {
        let n = normalizer();
        let mut fields = NormalizedInvoiceFields::empty(CurrencyCode::idr());
        n.apply_edit(&mut fields, "totalAmount", Some("1.500,50")).unwrap();
        n.apply_edit(&mut fields, "currencyCode", Some("usd")).unwrap();

        assert_eq!(fields.currency_code.as_str(), "USD");
        assert_eq!(fields.total_amount.as_deref(), Some("1,500.50"));
        assert_eq!(
            stored_total(&fields, &CurrencyCode::idr()),
            Some(Decimal::from_str("1500.50").unwrap())
        );
    }
}
