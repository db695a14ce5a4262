//! Submission domain model.
//!
//! A `Submission` is one expression-of-interest record: the submitter's
//! form fields, the file payloads still waiting to be uploaded, and the
//! durable list of files already stored externally. The processor owns
//! all mutation after intake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing status of a submission. Transitions are forward-only:
/// `pending → processing → {done | failed}`. The `processing` self-loop
/// (one file uploaded, more remain) does not change the stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Just created, no file work attempted.
    Pending,
    /// A worker has claimed the record; it may be mid-upload or stalled.
    Processing,
    /// All files uploaded and the notification was sent.
    Done,
    /// An unrecoverable error occurred; waits for operator intervention.
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Done => "done",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// Whether no further automatic transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Done | SubmissionStatus::Failed)
    }
}

/// An unrecognized status string in the store.
#[derive(Error, Debug)]
#[error("Unknown submission status '{0}'")]
pub struct InvalidStatus(pub String);

impl std::str::FromStr for SubmissionStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "processing" => Ok(SubmissionStatus::Processing),
            "done" => Ok(SubmissionStatus::Done),
            "failed" => Ok(SubmissionStatus::Failed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A file attached to a submission that has not yet been uploaded to
/// external storage. The payload travels base64-encoded on the wire and
/// in the persisted JSON columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFile {
    #[serde(rename = "base64", with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub filename: String,
    #[serde(rename = "mime")]
    pub mime_type: String,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// The durable record of one externally stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
}

/// Semantic category of an attached file. Credentials files are always
/// uploaded before experience files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Credentials,
    Experience,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Credentials => "credentials",
            FileCategory::Experience => "experience",
        }
    }
}

/// The two ordered pending-file collections of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingFiles {
    pub credentials: Vec<PendingFile>,
    pub experience: Vec<PendingFile>,
}

impl PendingFiles {
    pub fn total(&self) -> usize {
        self.credentials.len() + self.experience.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty() && self.experience.is_empty()
    }

    /// Removes and returns the next file to upload: the head of the
    /// credentials collection, or of the experience collection once
    /// credentials are exhausted.
    pub fn pop_next(&mut self) -> Option<(FileCategory, PendingFile)> {
        if !self.credentials.is_empty() {
            return Some((FileCategory::Credentials, self.credentials.remove(0)));
        }
        if !self.experience.is_empty() {
            return Some((FileCategory::Experience, self.experience.remove(0)));
        }
        None
    }
}

/// One expression-of-interest submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub agency_name: String,
    pub country: String,
    /// Free-text credentials description from the form.
    pub credentials: String,
    /// Selected opportunity tags.
    pub opportunities: Vec<String>,
    pub pending_files: PendingFiles,
    /// Append-only; entries from prior successful steps survive failures.
    pub uploaded_files: Vec<UploadedFile>,
    pub status: SubmissionStatus,
    /// Last recorded failure reason, cleared on success.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, at the terminal transition to done or failed.
    pub processed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Creates a fresh `pending` submission as the intake endpoint would.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        email: String,
        agency_name: String,
        country: String,
        credentials: String,
        opportunities: Vec<String>,
        pending_files: PendingFiles,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            agency_name,
            country,
            credentials,
            opportunities,
            pending_files,
            uploaded_files: vec![],
            status: SubmissionStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}
