//! Single-invocation pipeline tick.
//!
//! Each run claims at most one pending submission and advances it by one
//! step (one file upload, or the completion notification). Scheduling is
//! external; cron or a systemd timer invokes this binary repeatedly.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;

use eoi_pipeline::db::Database;
use eoi_pipeline::{
    load_config, Config, ConfigError, EmailNotifier, EoiError, HttpBlobUploader, SqliteStore,
    SubmissionProcessor, TickOutcome,
};

const DEFAULT_LOG_FILTER: &str = "info";

fn config_path() -> Result<PathBuf, String> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    if let Ok(env) = std::env::var("EOI_CONFIG") {
        return Ok(PathBuf::from(env));
    }
    Err("usage: eoi-tick <config.json> (or set EOI_CONFIG)".to_string())
}

fn database(config: &Config) -> Result<Database, EoiError> {
    let path = match &config.database_path {
        Some(path) => path.clone(),
        None => eoi_pipeline::db::default_database_path().ok_or_else(|| {
            EoiError::Config(ConfigError::Validation {
                message: "database_path not set and no home directory available".to_string(),
            })
        })?,
    };
    Ok(Database::open(&path)?)
}

fn run(config: Config) -> Result<TickOutcome, EoiError> {
    let timeout = config.request_timeout();
    let store = SqliteStore::new(database(&config)?);

    let uploader = HttpBlobUploader::new(
        config.uploader.endpoint.clone(),
        config.uploader.token.resolve()?,
        timeout,
    )?;

    let notifier = EmailNotifier::new(
        config.notifier.endpoint.clone(),
        config.notifier.token.resolve()?,
        config.notifier.recipient.clone(),
        config.notifier.sender.clone(),
        timeout,
    )?;

    let processor = SubmissionProcessor::new(store, uploader, notifier);
    Ok(processor.run_once()?)
}

fn main() -> ExitCode {
    if let Err(e) = eoi_pipeline::telemetry::init(DEFAULT_LOG_FILTER) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let path = match config_path() {
        Ok(path) => path,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(outcome) => {
            println!("{outcome}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("tick failed: {e}");
            eprintln!("tick failed: {e}");
            ExitCode::FAILURE
        }
    }
}
