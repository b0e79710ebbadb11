//! Monetary amount parsing and formatting.
//!
//! Amounts arrive from the extractor in whatever locale the invoice was
//! printed in. Parsing follows one policy:
//!
//! 1. Text before the first digit is dropped, then everything but digits, `.`
//!    and `,`.
//! 2. The currency picks a separator convention: the local currency groups
//!    thousands with `.` and uses `,` for decimals; every other currency is
//!    the other way round.
//! 3. With both separators present the convention wins when its decimal
//!    separator appears once, right of all grouping separators. A mirrored
//!    layout (a EUR total printed `1.234,56`) is read mirrored. Anything else
//!    is rejected.
//! 4. With one separator kind present, a trailing group of exactly three
//!    digits is a thousands group as long as the whole string groups cleanly
//!    (leading group of 1-3 digits not starting with `0`, every later group
//!    three digits). Otherwise a single separator is the decimal point and
//!    repeated separators are rejected.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::AmountError;
use crate::models::invoice::CurrencyCode;

/// Which characters group thousands and mark decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorStyle {
    pub thousands: char,
    pub decimal: char,
}

impl SeparatorStyle {
    /// Local-currency convention: `1.234.567,00`.
    pub const LOCAL: Self = Self {
        thousands: '.',
        decimal: ',',
    };

    /// Convention of every other currency: `1,234,567.00`.
    pub const STANDARD: Self = Self {
        thousands: ',',
        decimal: '.',
    };

    /// Pick the convention for amounts in `currency`.
    pub fn for_currency(currency: &CurrencyCode, local: &CurrencyCode) -> Self {
        if currency == local {
            Self::LOCAL
        } else {
            Self::STANDARD
        }
    }

    fn mirrored(self) -> Self {
        Self {
            thousands: self.decimal,
            decimal: self.thousands,
        }
    }

    /// The decimal separator appears once and after every grouping separator.
    fn fits(self, s: &str) -> bool {
        let decimals = s.matches(self.decimal).count();
        match (s.rfind(self.decimal), s.rfind(self.thousands)) {
            (Some(d), Some(t)) => decimals == 1 && d > t,
            (Some(_), None) => decimals == 1,
            (None, _) => true,
        }
    }
}

/// Parse an extractor-provided amount in `currency`.
pub fn parse_amount(
    raw: &str,
    currency: &CurrencyCode,
    local: &CurrencyCode,
) -> Result<Decimal, AmountError> {
    parse_with_style(raw, SeparatorStyle::for_currency(currency, local))
}

/// Parse an amount written with the given separator convention.
pub fn parse_with_style(raw: &str, style: SeparatorStyle) -> Result<Decimal, AmountError> {
    let invalid = |reason| AmountError::InvalidAmount {
        raw: raw.to_string(),
        reason,
    };

    let first_digit = raw
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| invalid("no digits"))?;
    let cleaned: String = raw[leading_separator(raw, first_digit)..]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    // "150.000,-" and ".5" style edges
    let trimmed = cleaned.trim_end_matches(['.', ',']);
    let cleaned = if trimmed.starts_with(['.', ',']) {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };

    let normalized = match (cleaned.contains('.'), cleaned.contains(',')) {
        (false, false) => cleaned,
        (true, true) => {
            resolve_mixed(&cleaned, style).ok_or_else(|| invalid("conflicting separators"))?
        }
        (true, false) => {
            resolve_single(&cleaned, '.').ok_or_else(|| invalid("irregular digit grouping"))?
        }
        (false, true) => {
            resolve_single(&cleaned, ',').ok_or_else(|| invalid("irregular digit grouping"))?
        }
    };

    Decimal::from_str(&normalized).map_err(|_| invalid("out of range"))
}

/// Start of the numeric part: `.75` keeps its separator, the dot of a
/// `Rp.` prefix does not.
fn leading_separator(raw: &str, first_digit: usize) -> usize {
    let mut before = raw[..first_digit].chars().rev();
    match (before.next(), before.next()) {
        (Some(sep @ ('.' | ',')), prev) if !prev.is_some_and(char::is_alphabetic) => {
            first_digit - sep.len_utf8()
        }
        _ => first_digit,
    }
}

fn resolve_mixed(s: &str, style: SeparatorStyle) -> Option<String> {
    [style, style.mirrored()]
        .into_iter()
        .find(|candidate| candidate.fits(s))
        .map(|chosen| {
            s.replace(chosen.thousands, "")
                .replace(chosen.decimal, ".")
        })
}

fn resolve_single(s: &str, separator: char) -> Option<String> {
    let groups: Vec<&str> = s.split(separator).collect();
    let grouped = groups_as_thousands(&groups);

    if groups.len() > 2 {
        return grouped.then(|| groups.concat());
    }

    let (integer, fraction) = (groups[0], groups[1]);
    if fraction.len() == 3 && grouped {
        Some(groups.concat())
    } else {
        Some(format!("{}.{}", integer, fraction))
    }
}

fn groups_as_thousands(groups: &[&str]) -> bool {
    let Some((first, rest)) = groups.split_first() else {
        return false;
    };

    (1..=3).contains(&first.len())
        && !first.starts_with('0')
        && rest.iter().all(|g| g.len() == 3)
}

/// Format an amount in the local-currency display form (`1.234.567,00`).
pub fn format_local(amount: Decimal) -> String {
    format_with_style(amount, SeparatorStyle::LOCAL)
}

/// Format an amount in the standard form of `currency`.
pub fn format_amount(amount: Decimal, currency: &CurrencyCode, local: &CurrencyCode) -> String {
    format_with_style(amount, SeparatorStyle::for_currency(currency, local))
}

/// Format with grouped thousands and at least two fractional digits.
///
/// Extra precision is kept, so parsing the result in the same style gives
/// back `amount` exactly.
pub fn format_with_style(amount: Decimal, style: SeparatorStyle) -> String {
    let mut digits = amount.abs().normalize();
    digits.rescale(digits.scale().max(2));
    let s = digits.to_string();
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(style.thousands);
        }
        formatted.push(*c);
    }

    // A lone separator before exactly three digits would read back as grouping
    let pad = if decimal_part.len() == 3 && chars.len() <= 3 { "0" } else { "" };
    format!("{}{}{}{}", formatted, style.decimal, decimal_part, pad)
}

/// Round to a whole local-currency unit, half away from zero.
pub fn round_to_unit(amount: Decimal) -> Decimal {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}
