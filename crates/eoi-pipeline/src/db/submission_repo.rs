//! Submission repository: CRUD operations for the `submissions` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw submission row from the database.
#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub agency_name: String,
    pub country: String,
    pub credentials: String,
    /// JSON array of opportunity tags.
    pub opportunities: String,
    /// JSON array of pending credential file payloads.
    pub pending_credential_files: String,
    /// JSON array of pending experience file payloads.
    pub pending_experience_files: String,
    /// JSON array of `{name, url}` pairs. Append-only.
    pub uploaded_files: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
}

impl SubmissionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            agency_name: row.get("agency_name")?,
            country: row.get("country")?,
            credentials: row.get("credentials")?,
            opportunities: row.get("opportunities")?,
            pending_credential_files: row.get("pending_credential_files")?,
            pending_experience_files: row.get("pending_experience_files")?,
            uploaded_files: row.get("uploaded_files")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

/// Query filter parameters for submission listing.
#[derive(Debug, Default, Clone)]
pub struct SubmissionFilter {
    pub status: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new submission row.
pub fn insert(db: &Database, submission: &SubmissionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO submissions (id, name, email, agency_name, country, credentials,
             opportunities, pending_credential_files, pending_experience_files, uploaded_files,
             status, error_message, created_at, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                submission.id,
                submission.name,
                submission.email,
                submission.agency_name,
                submission.country,
                submission.credentials,
                submission.opportunities,
                submission.pending_credential_files,
                submission.pending_experience_files,
                submission.uploaded_files,
                submission.status,
                submission.error_message,
                submission.created_at,
                submission.processed_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a submission by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<SubmissionRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM submissions WHERE id = ?1",
            params![id],
            SubmissionRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

/// Claims the oldest workable submission, `pending` or in-flight
/// `processing`, oldest `created_at` first with id as tie-break.
///
/// A `pending` candidate is flipped to `processing` by a conditional
/// update before it is returned. That update is the pickup commit point:
/// the row is only claimed if it is still `pending` at write time, so of
/// two racing callers exactly one wins the transition and the other sees
/// no claimable row. A `processing` candidate is returned unchanged; the
/// invocation resumes where the previous one stopped. Status never moves
/// back to `pending` here.
pub fn claim_oldest_eligible(db: &Database) -> Result<Option<SubmissionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let candidate: Option<(String, String)> = conn
            .query_row(
                "SELECT id, status FROM submissions
                 WHERE status IN ('pending', 'processing')
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let Some((id, status)) = candidate else {
            return Ok(None);
        };

        if status == "pending" {
            let flipped = conn.execute(
                "UPDATE submissions SET status = 'processing'
                 WHERE id = ?1 AND status = 'pending'",
                params![id],
            )?;
            if flipped == 0 {
                // Lost the race to a concurrent invocation.
                return Ok(None);
            }
        }

        conn.query_row(
            "SELECT * FROM submissions WHERE id = ?1",
            params![id],
            SubmissionRow::from_row,
        )
        .map(Some)
        .map_err(DatabaseError::Sqlite)
    })
}

/// Persists per-file progress: both pending collections and the uploaded
/// list are written by a single statement so they can never diverge.
pub fn save_progress(
    db: &Database,
    id: &str,
    pending_credential_files: &str,
    pending_experience_files: &str,
    uploaded_files: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE submissions SET pending_credential_files = ?2,
             pending_experience_files = ?3, uploaded_files = ?4
             WHERE id = ?1",
            params![
                id,
                pending_credential_files,
                pending_experience_files,
                uploaded_files
            ],
        )?;
        Ok(())
    })
}

/// Terminal transition to `done`. Clears the error message and discards
/// any leftover pending payload storage.
pub fn mark_done(db: &Database, id: &str, processed_at: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE submissions SET status = 'done', processed_at = ?2, error_message = NULL,
             pending_credential_files = '[]', pending_experience_files = '[]'
             WHERE id = ?1",
            params![id, processed_at],
        )?;
        Ok(())
    })
}

/// Terminal transition to `failed`. Pending and uploaded collections are
/// left untouched so an operator can reset and resume.
pub fn mark_failed(
    db: &Database,
    id: &str,
    error_message: &str,
    processed_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE submissions SET status = 'failed', error_message = ?2, processed_at = ?3
             WHERE id = ?1",
            params![id, error_message, processed_at],
        )?;
        Ok(())
    })
}

/// Resets a submission back to `pending` for re-processing. Operator action,
/// never called by the processor itself.
pub fn reset_to_pending(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE submissions SET status = 'pending', error_message = NULL, processed_at = NULL
             WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    })
}

/// Counts submissions with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Queries submissions with filters, returning (rows, total_count).
pub fn query(
    db: &Database,
    filter: &SubmissionFilter,
) -> Result<(Vec<SubmissionRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref from_date) = filter.from_date {
            conditions.push(format!("created_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(from_date.clone()));
        }
        if let Some(ref to_date) = filter.to_date {
            conditions.push(format!("created_at <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(to_date.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM submissions {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results, oldest first.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM submissions {} ORDER BY created_at ASC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<SubmissionRow> = stmt
            .query_map(params_ref.as_slice(), SubmissionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}
