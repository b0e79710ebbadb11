//! Incoming/outgoing classification.

use crate::models::invoice::InvoiceType;

/// Decide the invoice direction from the extracted seller name.
///
/// Only an exact, case-sensitive match against the company name counts as
/// outgoing. Whitespace or case variants classify as incoming.
pub fn classify(seller_name: Option<&str>, company_name: &str) -> InvoiceType {
    match seller_name {
        Some(seller) if seller == company_name => InvoiceType::Outgoing,
        _ => InvoiceType::Incoming,
    }
}
