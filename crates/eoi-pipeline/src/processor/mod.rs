//! Submission processor, the pipeline state machine.
//!
//! One invocation performs one bounded unit of work: claim the oldest
//! workable submission (`pending`, or `processing` left by a previous
//! invocation), then upload exactly one file (credentials before
//! experience) and persist the progress. Once both pending
//! collections are empty it instead sends the notification and marks the
//! record `done`. Any adapter failure is terminal for the record: it is written
//! back as `failed` with the reason, and recovery is an explicit operator
//! action. Repeated invocations drain a submission one file at a time, so
//! a crash or timeout loses at most one file's progress.

use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::notifier::{Notifier, NotifyError};
use crate::store::{StoreError, SubmissionStore};
use crate::submission::{FileCategory, PendingFile, Submission, UploadedFile};
use crate::uploader::{BlobUploader, UploadError, UploadRequest};

/// Result of one processor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No workable submission existed; nothing was mutated.
    Idle,
    /// One file was uploaded and progress persisted; the record stays
    /// `processing` with `remaining` files still pending.
    FileUploaded { id: String, remaining: usize },
    /// All files were uploaded and the notification was dispatched; the
    /// record is `done`.
    Completed { id: String },
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Idle => write!(f, "no pending submissions"),
            TickOutcome::FileUploaded { id, remaining } => {
                write!(
                    f,
                    "submission {}: processed one file, {} remaining",
                    id, remaining
                )
            }
            TickOutcome::Completed { id } => {
                write!(
                    f,
                    "submission {}: all files processed, notification sent",
                    id
                )
            }
        }
    }
}

/// Errors from one processor invocation. Upload and notify failures have
/// already been recorded on the submission when they surface here.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Upload failed for submission '{id}': {source}")]
    Upload {
        id: String,
        #[source]
        source: UploadError,
    },

    #[error("Notification failed for submission '{id}': {source}")]
    Notify {
        id: String,
        #[source]
        source: NotifyError,
    },
}

/// The submission processor, generic over its three seams so tests can
/// substitute fakes for the store, the object storage and the mail
/// transport.
pub struct SubmissionProcessor<S, U, N> {
    store: S,
    uploader: U,
    notifier: N,
}

impl<S, U, N> SubmissionProcessor<S, U, N>
where
    S: SubmissionStore,
    U: BlobUploader,
    N: Notifier,
{
    pub fn new(store: S, uploader: U, notifier: N) -> Self {
        Self {
            store,
            uploader,
            notifier,
        }
    }

    /// Performs exactly one pickup-and-advance cycle.
    ///
    /// The claim marks a fresh record `processing` before any external
    /// I/O, so a crash mid-upload leaves it visibly claimed instead of
    /// silently re-queued; the next invocation resumes it from there.
    /// The completion check happens before any pop: a record that was
    /// fully uploaded but never reached `done` goes straight to the
    /// notification branch on its next invocation.
    pub fn run_once(&self) -> Result<TickOutcome, ProcessError> {
        let Some(mut submission) = self.store.claim_oldest_eligible()? else {
            debug!("No pending submissions");
            return Ok(TickOutcome::Idle);
        };

        let _span = info_span!("submission_tick", submission_id = %submission.id).entered();
        info!(
            pending = submission.pending_files.total(),
            uploaded = submission.uploaded_files.len(),
            "Claimed submission"
        );

        match submission.pending_files.pop_next() {
            Some((category, file)) => self.upload_one(submission, category, file),
            None => self.complete(submission),
        }
    }

    /// Uploads a single payload and persists the moved file atomically:
    /// it leaves the pending collection in the same write that appends
    /// its uploaded entry.
    fn upload_one(
        &self,
        mut submission: Submission,
        category: FileCategory,
        file: PendingFile,
    ) -> Result<TickOutcome, ProcessError> {
        let request = UploadRequest {
            bytes: &file.bytes,
            filename: &file.filename,
            mime_type: &file.mime_type,
            owner_name: &submission.name,
            owner_org: &submission.agency_name,
        };

        let blob = match self.uploader.upload(&request) {
            Ok(blob) => blob,
            Err(source) => {
                let id = submission.id.clone();
                self.record_failure(&id, &source.to_string());
                return Err(ProcessError::Upload { id, source });
            }
        };

        submission.uploaded_files.push(UploadedFile {
            name: file.filename,
            url: blob.url,
        });
        self.store.save_progress(
            &submission.id,
            &submission.pending_files,
            &submission.uploaded_files,
        )?;

        let remaining = submission.pending_files.total();
        info!(
            category = category.as_str(),
            external_id = %blob.external_id,
            remaining,
            "Uploaded one file"
        );
        Ok(TickOutcome::FileUploaded {
            id: submission.id,
            remaining,
        })
    }

    /// Terminal branch: dispatch the notification, then persist `done`.
    fn complete(&self, submission: Submission) -> Result<TickOutcome, ProcessError> {
        if let Err(source) = self.notifier.send(&submission) {
            let id = submission.id.clone();
            self.record_failure(&id, &source.to_string());
            return Err(ProcessError::Notify { id, source });
        }

        self.store.mark_done(&submission.id, Utc::now())?;
        info!("Submission completed, notification sent");
        Ok(TickOutcome::Completed { id: submission.id })
    }

    /// Writes the failure back to the store. If that write itself fails
    /// the original cause still propagates; the store failure is logged
    /// rather than allowed to mask it.
    fn record_failure(&self, id: &str, message: &str) {
        warn!(error = message, "Marking submission failed");
        if let Err(store_err) = self.store.mark_failed(id, message, Utc::now()) {
            error!(error = %store_err, "Failed to persist failed status");
        }
    }
}
