use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::secrets::{resolve_secret, SecretError};

fn default_request_timeout_secs() -> u64 {
    30
}

/// Where a secret comes from. Exactly one source is expected; resolution
/// tries them in direct → file → env var order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretSource {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }
}

/// External object-storage API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UploaderConfig {
    pub endpoint: String,
    pub token: SecretSource,
}

/// Transactional-mail API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub token: SecretSource,
    /// Operator inbox that receives submission notifications.
    pub recipient: String,
    pub sender: String,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: String,
    /// Overrides the default `~/.eoi-pipeline/data/eoi.db` location.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    pub uploader: UploaderConfig,
    pub notifier: NotifierConfig,
    /// Hard timeout applied to every external request (upload and send).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
