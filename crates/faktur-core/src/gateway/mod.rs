//! The extraction gateway: one call to a multimodal language model per upload.
//!
//! The pipeline only depends on [`ExtractionGateway`]; the HTTP client behind
//! it is an adapter and can be swapped for a fake in tests.

#[cfg(feature = "http")]
mod openrouter;

#[cfg(feature = "http")]
pub use openrouter::OpenRouterGateway;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;

use crate::error::GatewayError;

/// Result type for gateway calls.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// An encoded image sent alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InvoiceImage {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }

    /// `data:` URL with the base64-encoded bytes.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// One upload, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// File name, used for logging and stored with the record.
    pub name: String,
    /// Text layer of a digital document.
    pub text: Option<String>,
    /// Scanned page or photo.
    pub image: Option<InvoiceImage>,
}

impl ExtractionRequest {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn from_image(name: impl Into<String>, image: InvoiceImage) -> Self {
        Self {
            name: name.into(),
            text: None,
            image: Some(image),
        }
    }

    /// The prompt for this request.
    pub fn prompt(&self) -> String {
        build_prompt(self.text.as_deref())
    }
}

/// A language-model endpoint that turns a prompt (and optional image) into text.
///
/// One attempt per call; retries and timeouts belong to the caller.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn invoke(&self, prompt: &str, image: Option<&InvoiceImage>) -> Result<String>;
}

const PROMPT_HEADER: &str = r#"You are reading an invoice. Return only a JSON object with exactly these keys:

{
  "sellerName": string or null,
  "sellerAddress": string or null,
  "sellerPhone": string or null,
  "sellerEmail": string or null,
  "sellerTaxId": string or null,
  "buyerName": string or null,
  "buyerAddress": string or null,
  "buyerPhone": string or null,
  "buyerEmail": string or null,
  "buyerTaxId": string or null,
  "invoiceNumber": string or null,
  "invoiceDate": string or null,
  "dueDate": string or null,
  "taxDetails": string or null,
  "totalAmount": string or null,
  "currencyCode": string or null
}

If a field is missing, set it to null.
Write "invoiceDate" and "dueDate" as dd/mm/yyyy.
Write "taxDetails" as a percentage only, for example "10%".
If the invoice prints several tax lines, combine them into one total percentage.
If only tax amounts are printed, write round(taxAmount / totalAmount * 100) followed by "%".
Write every address on a single line as "Street, City, Postal Code, Country".
Copy "totalAmount" exactly as printed, without the currency symbol.
Write "currencyCode" as a three-letter ISO 4217 code.
Do not add code fences, disclaimers or any other text."#;

/// Build the extraction prompt, appending the document text when there is one.
pub fn build_prompt(document_text: Option<&str>) -> String {
    match document_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!("{PROMPT_HEADER}\n\nINVOICE TEXT:\n{text}"),
        None => format!("{PROMPT_HEADER}\n\nThe invoice is in the attached image."),
    }
}

/// Read the model's reply from a chat-completions response body.
///
/// Only `choices[0].message.content` is looked at; a missing or non-string
/// value there is a malformed response.
pub fn read_content(response: &Value) -> Result<String> {
    match response.pointer("/choices/0/message/content") {
        Some(Value::String(content)) => Ok(content.clone()),
        Some(other) => Err(GatewayError::MalformedResponse(format!(
            "message content is not text: {other}"
        ))),
        None => Err(GatewayError::MalformedResponse(
            "no choices[0].message.content in response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_read_content() {
        let body = json!({
            "id": "gen-1",
            "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}]
        });
        assert_eq!(read_content(&body), Ok("{\"a\": 1}".to_string()));
    }

    #[test]
    fn test_read_content_rejects_other_shapes() {
        for body in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": [{"message": {}}]}),
            json!({"choices": [{"message": {"content": null}}]}),
            json!({"error": {"message": "rate limited"}}),
        ] {
            assert!(
                matches!(read_content(&body), Err(GatewayError::MalformedResponse(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_prompt_lists_every_key() {
        let prompt = build_prompt(Some("INVOICE #1"));
        for key in crate::models::invoice::TEXT_FIELDS {
            assert!(prompt.contains(&format!("\"{key}\"")), "{key}");
        }
        for key in ["invoiceDate", "dueDate", "taxDetails", "totalAmount", "currencyCode"] {
            assert!(prompt.contains(&format!("\"{key}\"")), "{key}");
        }
        assert!(prompt.ends_with("INVOICE TEXT:\nINVOICE #1"));
    }

    #[test]
    fn test_prompt_states_field_rules() {
        let prompt = build_prompt(None);
        assert!(prompt.contains("round(taxAmount / totalAmount * 100)"));
        assert!(prompt.contains("combine them into one total percentage"));
        assert!(prompt.contains("\"Street, City, Postal Code, Country\""));
    }

    #[test]
    fn test_prompt_without_text_mentions_image() {
        assert!(build_prompt(Some("   ")).ends_with("attached image."));
        assert!(build_prompt(None).ends_with("attached image."));
    }

    #[test]
    fn test_image_data_url() {
        let image = InvoiceImage::jpeg(vec![0xff, 0xd8, 0xff]);
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9j/");
    }
}
