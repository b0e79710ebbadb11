//! OpenRouter-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{read_content, ExtractionGateway, InvoiceImage, Result};
use crate::error::GatewayError;
use crate::models::config::GatewayConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Gateway backed by a `/chat/completions` endpoint.
pub struct OpenRouterGateway {
    client: Client,
    config: GatewayConfig,
}

impl OpenRouterGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("faktur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        info!(
            url = %config.base_url,
            model = %config.model,
            "Using chat-completions extraction endpoint"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

fn build_request<'a>(
    model: &'a str,
    prompt: &str,
    image: Option<&InvoiceImage>,
) -> Result<ChatRequest<'a>> {
    let mut content = Vec::with_capacity(2);

    if !prompt.trim().is_empty() {
        content.push(ContentPart::Text {
            text: prompt.to_string(),
        });
    }
    if let Some(image) = image {
        content.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url(),
            },
        });
    }
    if content.is_empty() {
        return Err(GatewayError::EmptyRequest);
    }

    Ok(ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content,
        }],
    })
}

#[async_trait]
impl ExtractionGateway for OpenRouterGateway {
    async fn invoke(&self, prompt: &str, image: Option<&InvoiceImage>) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(GatewayError::MissingApiKey)?;

        let request = build_request(&self.config.model, prompt, image)?;

        let mut builder = self.client.post(self.endpoint()).bearer_auth(api_key).json(&request);
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            builder = builder.header("X-Title", title);
        }

        debug!(
            prompt_chars = prompt.len(),
            has_image = image.is_some(),
            "Sending extraction request"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Extraction endpoint returned an error");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let content = read_content(&body)?;
        debug!(response_chars = content.len(), "Extraction response received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_with_text_and_image() {
        let image = InvoiceImage::jpeg(vec![1, 2, 3]);
        let request = build_request("some/model", "read this", Some(&image)).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "some/model",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "read this"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AQID"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(matches!(
            build_request("m", "  ", None),
            Err(GatewayError::EmptyRequest)
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let gateway = OpenRouterGateway::new(GatewayConfig::default()).unwrap();
        let result = gateway.invoke("prompt", None).await;
        assert_eq!(result, Err(GatewayError::MissingApiKey));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = GatewayConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..GatewayConfig::default()
        };
        let gateway = OpenRouterGateway::new(config).unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:11434/v1/chat/completions");
    }
}
