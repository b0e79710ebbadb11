//! Normalized invoice record and the loosely-typed extraction result it is built from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Untyped field map produced by the response parser.
///
/// Keys are not guaranteed to be present and values may be any JSON value;
/// the normalizer decides what counts as text.
pub type RawExtractionResult = serde_json::Map<String, serde_json::Value>;

/// Diagnostic key holding the gateway text when it could not be parsed.
pub const RAW_OUTPUT_KEY: &str = "rawExtractorOutput";

/// An ISO 4217-style currency code: exactly three uppercase ASCII letters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validate a code. Only exact three-letter uppercase input is accepted;
    /// lenient mapping of symbols lives in the normalizer.
    pub fn new(code: &str) -> Option<Self> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Some(Self(code.to_string()))
        } else {
            None
        }
    }

    /// Indonesian rupiah, the default local currency.
    pub fn idr() -> Self {
        Self("IDR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| format!("not a three-letter uppercase currency code: {s:?}"))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Direction of an invoice relative to the logged-in company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    /// Issued by someone else to the company.
    Incoming,
    /// Issued by the company itself.
    Outgoing,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Incoming => "incoming",
            InvoiceType::Outgoing => "outgoing",
        }
    }
}

impl FromStr for InvoiceType {
    type Err = String;

    /// Parse the serialized form, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" => Ok(InvoiceType::Incoming),
            "outgoing" => Ok(InvoiceType::Outgoing),
            _ => Err(format!("not an invoice type: {s:?}")),
        }
    }
}

/// The canonical invoice record.
///
/// Every optional field serializes as `null` when absent so downstream
/// consumers always see the full key set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInvoiceFields {
    pub seller_name: Option<String>,
    pub seller_address: Option<String>,
    pub seller_phone: Option<String>,
    pub seller_email: Option<String>,
    pub seller_tax_id: Option<String>,

    pub buyer_name: Option<String>,
    pub buyer_address: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_tax_id: Option<String>,

    pub invoice_number: Option<String>,
    /// `dd/mm/yyyy`.
    pub invoice_date: Option<String>,
    /// `dd/mm/yyyy`.
    pub due_date: Option<String>,

    /// Combined tax percentage, `"N%"`.
    pub tax_details: Option<String>,
    /// Total in the original currency's standard formatting.
    pub total_amount: Option<String>,
    /// Local-currency total as an integer string.
    pub final_total_amount: Option<String>,
    pub currency_code: CurrencyCode,
    /// Set only when the total was converted from a foreign currency.
    pub original_currency_code: Option<CurrencyCode>,

    pub invoice_type: InvoiceType,
}

/// Text fields that hold free-form identity or document values, by serialized key.
pub const TEXT_FIELDS: [&str; 11] = [
    "sellerName",
    "sellerAddress",
    "sellerPhone",
    "sellerEmail",
    "sellerTaxId",
    "buyerName",
    "buyerAddress",
    "buyerPhone",
    "buyerEmail",
    "buyerTaxId",
    "invoiceNumber",
];

impl NormalizedInvoiceFields {
    /// A record with every nullable field set to null.
    pub fn empty(currency_code: CurrencyCode) -> Self {
        Self {
            seller_name: None,
            seller_address: None,
            seller_phone: None,
            seller_email: None,
            seller_tax_id: None,
            buyer_name: None,
            buyer_address: None,
            buyer_phone: None,
            buyer_email: None,
            buyer_tax_id: None,
            invoice_number: None,
            invoice_date: None,
            due_date: None,
            tax_details: None,
            total_amount: None,
            final_total_amount: None,
            currency_code,
            original_currency_code: None,
            invoice_type: InvoiceType::Incoming,
        }
    }

    /// Mutable access to a free-text field by its serialized key.
    pub fn text_field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "sellerName" => &mut self.seller_name,
            "sellerAddress" => &mut self.seller_address,
            "sellerPhone" => &mut self.seller_phone,
            "sellerEmail" => &mut self.seller_email,
            "sellerTaxId" => &mut self.seller_tax_id,
            "buyerName" => &mut self.buyer_name,
            "buyerAddress" => &mut self.buyer_address,
            "buyerPhone" => &mut self.buyer_phone,
            "buyerEmail" => &mut self.buyer_email,
            "buyerTaxId" => &mut self.buyer_tax_id,
            "invoiceNumber" => &mut self.invoice_number,
            _ => return None,
        };
        Some(slot)
    }

    /// Whether the total was converted from a foreign currency.
    pub fn is_converted(&self) -> bool {
        self.original_currency_code.is_some()
    }

    /// List fields a reviewer still has to fill in.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.invoice_number.is_none() {
            issues.push("Missing invoice number".to_string());
        }

        if self.invoice_date.is_none() {
            issues.push("Missing invoice date".to_string());
        }

        match self.invoice_type {
            InvoiceType::Incoming if self.seller_name.is_none() => {
                issues.push("Missing seller name".to_string());
            }
            InvoiceType::Outgoing if self.buyer_name.is_none() => {
                issues.push("Missing buyer name".to_string());
            }
            _ => {}
        }

        if self.total_amount.is_none() {
            issues.push("Missing total amount".to_string());
        } else if self.final_total_amount.is_none() {
            issues.push("Missing local-currency total".to_string());
        }

        issues
    }
}

/// Reasons a record needs manual attention before it is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReviewFlag {
    /// The gateway output was not a JSON object; fields are mostly empty.
    ParseFailure,

    /// The total could not be read as a number.
    InvalidAmount { raw: String },

    /// No exchange rate was available; the total is unconverted.
    RateUnavailable { currency: String, reason: String },

    /// No usable currency was extracted and the local one was assumed.
    CurrencyDefaulted { raw: Option<String> },
}

impl fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewFlag::ParseFailure => {
                write!(f, "extractor output could not be parsed; fill fields manually")
            }
            ReviewFlag::InvalidAmount { raw } => {
                write!(f, "total amount {raw:?} is not a number; enter it manually")
            }
            ReviewFlag::RateUnavailable { currency, reason } => write!(
                f,
                "no exchange rate for {currency} ({reason}); total left unconverted"
            ),
            ReviewFlag::CurrencyDefaulted { raw: Some(raw) } => {
                write!(f, "currency {raw:?} not recognized; local currency assumed")
            }
            ReviewFlag::CurrencyDefaulted { raw: None } => {
                write!(f, "no currency found; local currency assumed")
            }
        }
    }
}
