//! Submission store contract.
//!
//! The processor only ever touches persisted submissions through this
//! trait, which keeps it testable against fakes and pins down the small
//! set of mutations the pipeline is allowed to make. Every mutating
//! operation applies atomically to a single record.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::submission::{InvalidStatus, PendingFiles, Submission, UploadedFile};

mod sqlite;

pub use sqlite::SqliteStore;

/// Errors from store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// A collection failed to encode to JSON before writing.
    #[error("Failed to encode submission field '{field}': {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted status string is not a known status.
    #[error("Submission '{id}' has an invalid status: {source}")]
    Status {
        id: String,
        #[source]
        source: InvalidStatus,
    },

    /// A persisted timestamp failed to parse.
    #[error("Submission '{id}' has an invalid timestamp '{value}'")]
    Timestamp { id: String, value: String },
}

/// Persistence operations required by the submission processor.
pub trait SubmissionStore {
    /// Persists a freshly created `pending` submission.
    fn create(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Claims the oldest workable submission. A `pending` record is
    /// atomically flipped to `processing` before it is returned; the
    /// conditional update is what makes concurrent invocations mutually
    /// exclusive at that transition. An in-flight `processing` record is
    /// returned as-is so the next invocation resumes it.
    fn claim_oldest_eligible(&self) -> Result<Option<Submission>, StoreError>;

    /// Persists both pending collections and the uploaded list together.
    /// They must never be written separately: a file leaves pending in the
    /// same write that appends its uploaded entry.
    fn save_progress(
        &self,
        id: &str,
        pending: &PendingFiles,
        uploaded: &[UploadedFile],
    ) -> Result<(), StoreError>;

    /// Terminal transition to `done`. Sets `processed_at`, clears the
    /// error message and discards leftover payload storage.
    fn mark_done(&self, id: &str, processed_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Terminal transition to `failed` with the failure reason recorded.
    fn mark_failed(
        &self,
        id: &str,
        error_message: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Looks up a single submission by id.
    fn find(&self, id: &str) -> Result<Option<Submission>, StoreError>;
}
