//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::invoice::CurrencyCode;

/// Main configuration for faktur.
///
/// Every collaborator receives its section explicitly; nothing in the library
/// reads the process environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FakturConfig {
    /// Extraction gateway configuration.
    pub gateway: GatewayConfig,

    /// Exchange-rate service configuration.
    pub rates: RatesConfig,

    /// Pipeline policy.
    pub pipeline: PipelineConfig,

    /// Upload loading configuration.
    pub upload: UploadConfig,

    /// Invoice store configuration.
    pub store: StoreConfig,
}

/// Chat-completions endpoint used for field extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Model identifier sent with each request.
    pub model: String,

    /// Bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Optional `HTTP-Referer` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Optional `X-Title` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Upper bound for one extraction call.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemma-3-27b-it:free".to_string(),
            api_key: None,
            referer: None,
            title: None,
            timeout_secs: 60,
        }
    }
}

/// Exchange-rate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Frankfurter-compatible base URL; `/latest` is appended.
    pub base_url: String,

    /// Upper bound for one rate lookup.
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.dev/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Pipeline policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target currency of every conversion.
    pub local_currency: CurrencyCode,

    /// Name of the logged-in company, compared against the extracted seller.
    pub company_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            local_currency: CurrencyCode::idr(),
            company_name: String::new(),
        }
    }
}

/// Upload preprocessing before the gateway call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Longer-side limit in pixels; larger images are scaled down.
    pub max_image_size: u32,

    /// JPEG quality used when re-encoding images.
    pub jpeg_quality: u8,

    /// Minimum embedded text length for a PDF to be sent as text.
    pub min_pdf_text_length: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_size: 2048,
            jpeg_quality: 85,
            min_pdf_text_length: 50,
        }
    }
}

/// Invoice store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON store file. `None` lets the caller pick a platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Owner ID used when the caller does not supply one.
    pub owner: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            owner: "local".to_string(),
        }
    }
}

impl FakturConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FakturConfig::default();
        assert_eq!(config.pipeline.local_currency.as_str(), "IDR");
        assert_eq!(config.gateway.timeout_secs, 60);
        assert_eq!(config.store.owner, "local");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: FakturConfig =
            serde_json::from_str(r#"{"pipeline":{"company_name":"Acme Corp"}}"#).unwrap();
        assert_eq!(config.pipeline.company_name, "Acme Corp");
        assert_eq!(config.pipeline.local_currency.as_str(), "IDR");
        assert_eq!(config.rates.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_local_currency_rejected() {
        let result: Result<FakturConfig, _> =
            serde_json::from_str(r#"{"pipeline":{"local_currency":"rupiah"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FakturConfig::default();
        config.pipeline.company_name = "Acme Corp".to_string();
        config.save(&path).unwrap();

        let loaded = FakturConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pipeline.company_name, "Acme Corp");
    }
}
