//! Per-field normalization rules for extractor output.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod patterns;
pub mod tax;
pub mod text;

pub use amounts::{
    format_amount, format_local, parse_amount, round_to_unit, SeparatorStyle,
};
pub use currency::{normalize_currency, CurrencyRule};
pub use dates::{normalize_date, DateRule};
pub use tax::{normalize_tax, TaxRule};
pub use text::{normalize_text, TextRule};

/// Trait for field rules.
pub trait FieldRule {
    /// The type of value this rule produces.
    type Output;

    /// Normalize one raw value; `None` means the field is null.
    fn normalize(&self, raw: &str) -> Option<Self::Output>;

    /// Normalize an optional value.
    fn normalize_opt(&self, raw: Option<&str>) -> Option<Self::Output> {
        raw.and_then(|value| self.normalize(value))
    }
}
