//! SQLite-backed submission store.
//!
//! Translates between the domain aggregate and the row encoding used by
//! `db::submission_repo`. The pending and uploaded collections live in
//! JSON columns; decoding is defensive: a corrupt column is logged
//! loudly and treated as empty so one bad record cannot poison the queue.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::db::submission_repo::{self, SubmissionFilter, SubmissionRow};
use crate::db::Database;
use crate::submission::{
    PendingFile, PendingFiles, Submission, SubmissionStatus, UploadedFile,
};

use super::{StoreError, SubmissionStore};

/// Submission store over a rusqlite `Database` handle.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Resets a terminal or stuck submission back to `pending`.
    /// Operator tooling only; the processor never self-heals.
    pub fn reset_to_pending(&self, id: &str) -> Result<(), StoreError> {
        submission_repo::reset_to_pending(&self.db, id)?;
        Ok(())
    }

    /// Counts submissions currently in the given status.
    pub fn count_by_status(&self, status: SubmissionStatus) -> Result<u64, StoreError> {
        Ok(submission_repo::count_by_status(&self.db, status.as_str())?)
    }

    /// Lists submissions for operator inspection, oldest first.
    pub fn list(
        &self,
        status: Option<SubmissionStatus>,
        limit: Option<u64>,
    ) -> Result<Vec<Submission>, StoreError> {
        let filter = SubmissionFilter {
            status: status.map(|s| s.as_str().to_string()),
            limit,
            ..Default::default()
        };
        let (rows, _total) = submission_repo::query(&self.db, &filter)?;
        rows.into_iter().map(from_row).collect()
    }
}

impl SubmissionStore for SqliteStore {
    fn create(&self, submission: &Submission) -> Result<(), StoreError> {
        let row = to_row(submission)?;
        submission_repo::insert(&self.db, &row)?;
        Ok(())
    }

    fn claim_oldest_eligible(&self) -> Result<Option<Submission>, StoreError> {
        match submission_repo::claim_oldest_eligible(&self.db)? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    fn save_progress(
        &self,
        id: &str,
        pending: &PendingFiles,
        uploaded: &[UploadedFile],
    ) -> Result<(), StoreError> {
        let credential_json = encode("pending_credential_files", &pending.credentials)?;
        let experience_json = encode("pending_experience_files", &pending.experience)?;
        let uploaded_json = encode("uploaded_files", &uploaded)?;
        submission_repo::save_progress(
            &self.db,
            id,
            &credential_json,
            &experience_json,
            &uploaded_json,
        )?;
        Ok(())
    }

    fn mark_done(&self, id: &str, processed_at: DateTime<Utc>) -> Result<(), StoreError> {
        submission_repo::mark_done(&self.db, id, &format_timestamp(processed_at))?;
        Ok(())
    }

    fn mark_failed(
        &self,
        id: &str,
        error_message: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        submission_repo::mark_failed(
            &self.db,
            id,
            error_message,
            &format_timestamp(processed_at),
        )?;
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        match submission_repo::find_by_id(&self.db, id)? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }
}

// Full nanosecond precision so `Utc::now()` values round-trip exactly.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp {
            id: id.to_string(),
            value: value.to_string(),
        })
}

fn encode<T: serde::Serialize>(field: &'static str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { field, source })
}

/// Decodes a persisted JSON collection, degrading to empty on corruption.
/// The data loss is surfaced through an error-level event so operators can
/// act on it; crashing here would poison the queue with an unprocessable
/// record forever.
fn decode_or_empty<T: DeserializeOwned>(id: &str, field: &str, raw: &str) -> Vec<T> {
    match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            error!(
                submission_id = %id,
                field,
                error = %e,
                "Corrupt persisted collection; treating as empty"
            );
            vec![]
        }
    }
}

fn to_row(submission: &Submission) -> Result<SubmissionRow, StoreError> {
    Ok(SubmissionRow {
        id: submission.id.clone(),
        name: submission.name.clone(),
        email: submission.email.clone(),
        agency_name: submission.agency_name.clone(),
        country: submission.country.clone(),
        credentials: submission.credentials.clone(),
        opportunities: encode("opportunities", &submission.opportunities)?,
        pending_credential_files: encode(
            "pending_credential_files",
            &submission.pending_files.credentials,
        )?,
        pending_experience_files: encode(
            "pending_experience_files",
            &submission.pending_files.experience,
        )?,
        uploaded_files: encode("uploaded_files", &submission.uploaded_files)?,
        status: submission.status.as_str().to_string(),
        error_message: submission.error_message.clone(),
        created_at: format_timestamp(submission.created_at),
        processed_at: submission.processed_at.map(format_timestamp),
    })
}

fn from_row(row: SubmissionRow) -> Result<Submission, StoreError> {
    let status = SubmissionStatus::from_str(&row.status).map_err(|source| StoreError::Status {
        id: row.id.clone(),
        source,
    })?;
    let created_at = parse_timestamp(&row.id, &row.created_at)?;
    let processed_at = row
        .processed_at
        .as_deref()
        .map(|v| parse_timestamp(&row.id, v))
        .transpose()?;

    let pending_files = PendingFiles {
        credentials: decode_or_empty::<PendingFile>(
            &row.id,
            "pending_credential_files",
            &row.pending_credential_files,
        ),
        experience: decode_or_empty::<PendingFile>(
            &row.id,
            "pending_experience_files",
            &row.pending_experience_files,
        ),
    };

    Ok(Submission {
        uploaded_files: decode_or_empty::<UploadedFile>(
            &row.id,
            "uploaded_files",
            &row.uploaded_files,
        ),
        opportunities: decode_or_empty::<String>(&row.id, "opportunities", &row.opportunities),
        pending_files,
        id: row.id,
        name: row.name,
        email: row.email,
        agency_name: row.agency_name,
        country: row.country,
        credentials: row.credentials,
        status,
        error_message: row.error_message,
        created_at,
        processed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::submission_repo;

    fn test_store() -> SqliteStore {
        SqliteStore::new(Database::open_in_memory().unwrap())
    }

    fn pending_file(name: &str) -> PendingFile {
        PendingFile {
            bytes: vec![1, 2, 3],
            filename: name.to_string(),
            mime_type: "application/pdf".to_string(),
        }
    }

    fn sample_submission() -> Submission {
        Submission::new(
            "Jane Doe".to_string(),
            "jane@example.com".to_string(),
            "Acme Consulting".to_string(),
            "Switzerland".to_string(),
            "10 years of practice".to_string(),
            vec!["infrastructure".to_string(), "energy".to_string()],
            PendingFiles {
                credentials: vec![pending_file("deck.pdf")],
                experience: vec![pending_file("cv.pdf")],
            },
        )
    }

    #[test]
    fn test_create_and_find_round_trip() {
        let store = test_store();
        let submission = sample_submission();
        store.create(&submission).unwrap();

        let found = store.find(&submission.id).unwrap().unwrap();
        assert_eq!(found.name, "Jane Doe");
        assert_eq!(found.status, SubmissionStatus::Pending);
        assert_eq!(found.opportunities.len(), 2);
        assert_eq!(found.pending_files.credentials[0].bytes, vec![1, 2, 3]);
        assert_eq!(found.pending_files.experience[0].filename, "cv.pdf");
        assert_eq!(found.created_at, submission.created_at);
    }

    #[test]
    fn test_claim_marks_processing_and_resumes() {
        let store = test_store();
        let submission = sample_submission();
        store.create(&submission).unwrap();

        let claimed = store.claim_oldest_eligible().unwrap().unwrap();
        assert_eq!(claimed.id, submission.id);
        assert_eq!(claimed.status, SubmissionStatus::Processing);

        // In-flight records stay claimable until a terminal transition.
        let resumed = store.claim_oldest_eligible().unwrap().unwrap();
        assert_eq!(resumed.id, submission.id);

        store.mark_done(&submission.id, Utc::now()).unwrap();
        assert!(store.claim_oldest_eligible().unwrap().is_none());
    }

    #[test]
    fn test_save_progress_round_trip() {
        let store = test_store();
        let mut submission = sample_submission();
        store.create(&submission).unwrap();

        let (_, file) = submission.pending_files.pop_next().unwrap();
        submission.uploaded_files.push(UploadedFile {
            name: file.filename,
            url: "https://blobs.example/deck".to_string(),
        });
        store
            .save_progress(
                &submission.id,
                &submission.pending_files,
                &submission.uploaded_files,
            )
            .unwrap();

        let found = store.find(&submission.id).unwrap().unwrap();
        assert!(found.pending_files.credentials.is_empty());
        assert_eq!(found.pending_files.experience.len(), 1);
        assert_eq!(found.uploaded_files.len(), 1);
        assert_eq!(found.uploaded_files[0].name, "deck.pdf");
    }

    #[test]
    fn test_mark_done_and_failed() {
        let store = test_store();
        let first = sample_submission();
        let second = sample_submission();
        store.create(&first).unwrap();
        store.create(&second).unwrap();

        let now = Utc::now();
        store.mark_done(&first.id, now).unwrap();
        store.mark_failed(&second.id, "upload refused", now).unwrap();

        let done = store.find(&first.id).unwrap().unwrap();
        assert_eq!(done.status, SubmissionStatus::Done);
        assert!(done.pending_files.is_empty());
        assert!(done.error_message.is_none());
        assert_eq!(done.processed_at.unwrap(), now);

        let failed = store.find(&second.id).unwrap().unwrap();
        assert_eq!(failed.status, SubmissionStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("upload refused"));
        // Failed records keep their payloads for operator-driven retry.
        assert_eq!(failed.pending_files.total(), 2);
    }

    #[test]
    fn test_timestamps_round_trip_at_full_precision() {
        let now = Utc::now();
        assert_eq!(parse_timestamp("t-1", &format_timestamp(now)).unwrap(), now);

        // Sub-microsecond component must survive the store boundary.
        let nanos = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            parse_timestamp("t-1", &format_timestamp(nanos)).unwrap(),
            nanos
        );
    }

    #[test]
    fn test_corrupt_collection_decodes_as_empty() {
        let store = test_store();
        let submission = sample_submission();
        store.create(&submission).unwrap();

        // Corrupt the persisted JSON behind the store's back.
        submission_repo::save_progress(
            &store.db,
            &submission.id,
            "{{{not json",
            "[]",
            "[]",
        )
        .unwrap();

        let found = store.find(&submission.id).unwrap().unwrap();
        assert!(found.pending_files.credentials.is_empty());
        assert!(found.pending_files.experience.is_empty());
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let store = test_store();
        let submission = sample_submission();
        store.create(&submission).unwrap();

        store
            .db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE submissions SET status = 'archived' WHERE id = ?1",
                    rusqlite::params![submission.id],
                )?;
                Ok(())
            })
            .unwrap();

        let err = store.find(&submission.id).unwrap_err();
        assert!(matches!(err, StoreError::Status { .. }));
    }

    #[test]
    fn test_list_and_count() {
        let store = test_store();
        let first = sample_submission();
        let second = sample_submission();
        store.create(&first).unwrap();
        store.create(&second).unwrap();
        store.mark_failed(&second.id, "boom", Utc::now()).unwrap();

        assert_eq!(store.count_by_status(SubmissionStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_by_status(SubmissionStatus::Failed).unwrap(), 1);

        let failed = store.list(Some(SubmissionStatus::Failed), None).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, second.id);
    }

    #[test]
    fn test_reset_to_pending_allows_reclaim() {
        let store = test_store();
        let submission = sample_submission();
        store.create(&submission).unwrap();
        store.claim_oldest_eligible().unwrap().unwrap();
        store
            .mark_failed(&submission.id, "boom", Utc::now())
            .unwrap();

        // Failed records are not claimable until an operator resets them.
        assert!(store.claim_oldest_eligible().unwrap().is_none());
        store.reset_to_pending(&submission.id).unwrap();

        let reclaimed = store.claim_oldest_eligible().unwrap().unwrap();
        assert_eq!(reclaimed.id, submission.id);
    }
}
