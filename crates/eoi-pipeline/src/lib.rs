pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod notifier;
pub mod processor;
pub mod secrets;
pub mod store;
pub mod submission;
pub mod telemetry;
pub mod uploader;

pub use config::{load_config, load_config_from_str, Config};
pub use error::{ConfigError, EoiError, Result};
pub use intake::{accept, IntakeError, IntakeRequest};
pub use notifier::{EmailNotifier, Notifier, NotifyError};
pub use processor::{ProcessError, SubmissionProcessor, TickOutcome};
pub use secrets::{resolve_secret, SecretError};
pub use store::{SqliteStore, StoreError, SubmissionStore};
pub use submission::{PendingFile, PendingFiles, Submission, SubmissionStatus, UploadedFile};
pub use uploader::{BlobUploader, HttpBlobUploader, UploadError};
