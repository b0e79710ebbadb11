//! CLI subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod invoices;
pub mod output;
pub mod process;
pub mod rates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use faktur_core::models::config::FakturConfig;
use faktur_core::{FrankfurterRates, InvoicePipeline, JsonFileStore, OpenRouterGateway};

/// Environment variable consulted when the config has no API key.
pub const API_KEY_ENV: &str = "FAKTUR_API_KEY";

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("faktur")
        .join("config.json")
}

/// The `-c` path, or the platform default.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the config file, falling back to defaults when the default file is
/// missing. An explicit `-c` path must exist.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<FakturConfig> {
    let path = config_path(explicit);

    let mut config = if path.exists() {
        FakturConfig::from_file(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?
    } else if explicit.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        debug!("No config at {}, using defaults", path.display());
        FakturConfig::default()
    };

    if config.gateway.api_key.is_none() {
        config.gateway.api_key = std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty());
    }

    Ok(config)
}

/// Store file from the config, or the platform data directory.
pub fn store_path(config: &FakturConfig) -> PathBuf {
    config.store.path.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("faktur")
            .join("invoices.json")
    })
}

pub async fn open_store(config: &FakturConfig) -> anyhow::Result<JsonFileStore> {
    let path = store_path(config);
    JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open invoice store {}", path.display()))
}

/// Pipeline wired to the configured HTTP collaborators.
pub fn build_pipeline(config: &FakturConfig) -> anyhow::Result<InvoicePipeline> {
    let gateway = OpenRouterGateway::new(config.gateway.clone())?;
    let rates = FrankfurterRates::new(&config.rates)?;
    Ok(InvoicePipeline::new(Arc::new(gateway), Arc::new(rates), config))
}

/// File name without directories, for display and storage.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
