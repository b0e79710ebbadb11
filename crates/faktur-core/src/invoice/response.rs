//! Turning raw gateway text into a loosely-typed field map.

use serde_json::Value;
use tracing::debug;

use crate::models::invoice::{RawExtractionResult, RAW_OUTPUT_KEY};

use super::rules::patterns::{CODE_FENCE, OPEN_FENCE};

/// Outcome of parsing one gateway response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Parsed fields, or the diagnostic fallback map.
    pub fields: RawExtractionResult,
    /// The text did not contain a JSON object.
    pub parse_failure: bool,
}

/// Remove markdown code fences and trim.
///
/// Fenced blocks are replaced by their content (language tag dropped) and a
/// dangling opening fence from truncated output is removed. Text outside the
/// fences is kept. Applying it twice gives the same result as applying it once.
pub fn strip_code_fences(text: &str) -> String {
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(text, "${1}");
    let unfenced = OPEN_FENCE.replace_all(&unfenced, "");
    unfenced.trim().to_string()
}

/// Parse the JSON object between the first `{` and the last `}`.
///
/// Never fails: anything that is not a JSON object comes back as a map with
/// the input text under [`RAW_OUTPUT_KEY`] and `parse_failure` set.
pub fn parse_response(text: &str) -> ParsedResponse {
    match locate_object(text).and_then(|json| serde_json::from_str::<Value>(json).ok()) {
        Some(Value::Object(fields)) => ParsedResponse {
            fields,
            parse_failure: false,
        },
        _ => {
            debug!("No JSON object in {} characters of extractor output", text.len());
            let mut fields = RawExtractionResult::new();
            fields.insert(RAW_OUTPUT_KEY.to_string(), Value::String(text.to_string()));
            ParsedResponse {
                fields,
                parse_failure: true,
            }
        }
    }
}

fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_plain_fence_and_keeps_prose() {
        let text = "Here you go:\n```\n{\"a\": 1}\n```\nLet me know if anything else is needed.";
        assert_eq!(
            strip_code_fences(text),
            "Here you go:\n{\"a\": 1}\n\nLet me know if anything else is needed."
        );
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1"), "{\"a\": 1");
    }

    #[test]
    fn test_strip_is_identity_on_clean_text() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let samples = [
            "",
            "```",
            "````",
            "``````",
            "```json\n{}\n```",
            "a ``` b ``` c ``` d",
            "```\n```json\n{\"x\":1}\n```\n```",
            "   ```python\nprint(1)\n```   trailing",
            "`````json\n{}``` ``",
        ];
        for s in samples {
            let once = strip_code_fences(s);
            assert_eq!(strip_code_fences(&once), once, "{s:?}");
        }
    }

    #[test]
    fn test_parse_object() {
        let parsed = parse_response(r#"{"sellerName": "Acme Corp", "dueDate": null}"#);
        assert!(!parsed.parse_failure);
        assert_eq!(parsed.fields["sellerName"], "Acme Corp");
        assert_eq!(parsed.fields["dueDate"], Value::Null);
    }

    #[test]
    fn test_parse_ignores_surrounding_prose() {
        let raw = "```json\n{\"totalAmount\": \"100\"}\n```\nNote: the total was hard to read.";
        let parsed = parse_response(&strip_code_fences(raw));
        assert!(!parsed.parse_failure);
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.fields["totalAmount"], "100");
    }

    #[test]
    fn test_parse_fallback_keeps_raw_text() {
        for s in ["no json here", "{not: valid", "{\"a\": }", "[1, 2]", "} backwards {", ""] {
            let parsed = parse_response(s);
            assert!(parsed.parse_failure, "{s:?}");
            assert_eq!(parsed.fields.len(), 1);
            assert_eq!(parsed.fields[RAW_OUTPUT_KEY], Value::String(s.to_string()));
        }
    }
}
