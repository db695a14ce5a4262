use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::intake::IntakeError;
use crate::notifier::NotifyError;
use crate::processor::ProcessError;
use crate::secrets::SecretError;
use crate::store::StoreError;
use crate::uploader::UploadError;

#[derive(Error, Debug)]
pub enum EoiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret resolution error: {0}")]
    Secret(#[from] SecretError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, EoiError>;
