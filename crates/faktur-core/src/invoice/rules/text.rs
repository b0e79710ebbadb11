//! Free-text identity and document fields.

use super::FieldRule;
use super::patterns::LINE_BREAKS;

/// Values models print instead of leaving a field empty.
const MISSING_MARKERS: [&str; 5] = ["null", "undefined", "n/a", "none", "-"];

/// Text field rule.
pub struct TextRule;

impl TextRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for TextRule {
    type Output = String;

    fn normalize(&self, raw: &str) -> Option<Self::Output> {
        normalize_text(raw)
    }
}

/// Trim a text value; empty values and missing-value markers become `None`.
///
/// Line breaks are folded into `", "` so multi-line addresses stay single-line.
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return None;
    }

    Some(LINE_BREAKS.replace_all(trimmed, ", ").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims() {
        assert_eq!(normalize_text("  Acme Corp "), Some("Acme Corp".to_string()));
    }

    #[test]
    fn test_empty_and_markers() {
        assert_eq!(normalize_text(""), None);
        assert_eq!(normalize_text("   "), None);
        assert_eq!(normalize_text("null"), None);
        assert_eq!(normalize_text("N/A"), None);
    }

    #[test]
    fn test_multiline_address() {
        assert_eq!(
            normalize_text("Jl. Sudirman 1\nJakarta\r\n10220\nIndonesia"),
            Some("Jl. Sudirman 1, Jakarta, 10220, Indonesia".to_string())
        );
    }
}
