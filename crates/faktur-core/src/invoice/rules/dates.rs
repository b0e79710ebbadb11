//! Invoice and due date normalization to `dd/mm/yyyy`.

use chrono::NaiveDate;

use super::FieldRule;
use super::patterns::{DATE_DMY, DATE_ISO};

/// Date field rule.
pub struct DateRule;

impl DateRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for DateRule {
    type Output = String;

    fn normalize(&self, raw: &str) -> Option<Self::Output> {
        normalize_date(raw)
    }
}

/// Normalize an extracted date to zero-padded `dd/mm/yyyy`.
///
/// Day-first input with `/`, `.` or `-` separators and ISO `yyyy-mm-dd` are
/// accepted. Placeholders such as `xx/xx/xxxx` or `00/00/0000`, and dates that
/// do not exist on the calendar, yield `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let (day, month, year): (u32, u32, i32) = if let Some(caps) = DATE_DMY.captures(raw) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = DATE_ISO.captures(raw) {
        (caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
    } else {
        return None;
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%d/%m/%Y").to_string())
}

/// Parse a normalized `dd/mm/yyyy` value back into a date.
pub fn parse_normalized(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pads_single_digits() {
        assert_eq!(normalize_date("1/2/2025"), Some("01/02/2025".to_string()));
        assert_eq!(normalize_date(" 9/11/2024 "), Some("09/11/2024".to_string()));
    }

    #[test]
    fn test_keeps_canonical_dates() {
        assert_eq!(normalize_date("15/01/2024"), Some("15/01/2024".to_string()));
    }

    #[test]
    fn test_alternate_separators() {
        assert_eq!(normalize_date("15.01.2024"), Some("15/01/2024".to_string()));
        assert_eq!(normalize_date("15-01-2024"), Some("15/01/2024".to_string()));
        assert_eq!(normalize_date("2024-01-15"), Some("15/01/2024".to_string()));
    }

    #[test]
    fn test_placeholders_are_null() {
        assert_eq!(normalize_date("xx/xx/xxxx"), None);
        assert_eq!(normalize_date("XX/XX/XXXX"), None);
        assert_eq!(normalize_date("dd/mm/yyyy"), None);
        assert_eq!(normalize_date("00/00/0000"), None);
    }

    #[test]
    fn test_rejects_impossible_and_free_text() {
        assert_eq!(normalize_date("31/02/2025"), None);
        assert_eq!(normalize_date("13/13/2025"), None);
        assert_eq!(normalize_date("15 January 2024"), None);
        assert_eq!(normalize_date("1/2/25"), None);
        assert_eq!(normalize_date(""), None);
    }

    #[test]
    fn test_rule_matches_free_function() {
        let rule = DateRule::new();
        assert_eq!(rule.normalize("1/2/2025"), normalize_date("1/2/2025"));
        assert_eq!(
            parse_normalized("01/02/2025"),
            NaiveDate::from_ymd_opt(2025, 2, 1)
        );
    }
}
