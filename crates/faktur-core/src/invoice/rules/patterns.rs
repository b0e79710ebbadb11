//! Common regex patterns for extractor-output normalization.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Fenced block; a language tag only counts when it ends its line.
    pub static ref CODE_FENCE: Regex = Regex::new(
        r"(?s)```(?:(?:[A-Za-z][\w+\-]*)?[ \t]*\r?\n)?(.*?)```"
    ).unwrap();

    // Opening fence left behind by truncated output.
    pub static ref OPEN_FENCE: Regex = Regex::new(
        r"```(?:(?:[A-Za-z][\w+\-]*)?[ \t]*\r?\n)?"
    ).unwrap();

    // Day-first dates: 1/2/2025, 01.02.2025, 01-02-2025
    pub static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})$"
    ).unwrap();

    // ISO dates: 2025-02-01
    pub static ref DATE_ISO: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})$"
    ).unwrap();

    // Percentage anywhere in a tax description: "PPN 11%", "10,5 %"
    pub static ref PERCENTAGE: Regex = Regex::new(
        r"(\d+(?:[.,]\d+)?)\s*%"
    ).unwrap();

    pub static ref BARE_NUMBER: Regex = Regex::new(
        r"^\d+(?:[.,]\d+)?$"
    ).unwrap();

    // Final shape of taxDetails
    pub static ref TAX_SHAPE: Regex = Regex::new(
        r"^\d+(\.\d+)?%$"
    ).unwrap();

    // Three-letter code embedded in a longer currency description
    pub static ref CURRENCY_TOKEN: Regex = Regex::new(
        r"\b([A-Z]{3})\b"
    ).unwrap();

    pub static ref LINE_BREAKS: Regex = Regex::new(
        r"\s*[\r\n]+\s*"
    ).unwrap();
}
