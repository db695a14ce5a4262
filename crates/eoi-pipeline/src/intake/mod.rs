//! Intake decoding and validation.
//!
//! The HTTP endpoint itself lives elsewhere; this module owns the step
//! that turns the wire DTO into a validated `pending` submission. A
//! request is either rejected wholesale with a typed error or stored
//! completely.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::store::{StoreError, SubmissionStore};
use crate::submission::{PendingFile, PendingFiles, Submission};

/// Fallback MIME type when the client omits one and the filename
/// extension is unknown.
const DEFAULT_MIME: &str = "application/octet-stream";

/// Errors from intake validation.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Invalid base64 payload for file '{filename}': {source}")]
    InvalidPayload {
        filename: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Attached file has an empty filename")]
    EmptyFilename,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One attached file as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeFile {
    pub base64: String,
    pub filename: String,
    #[serde(default)]
    pub mime: Option<String>,
}

/// The two file categories of the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeFiles {
    #[serde(default)]
    pub credentials: Vec<IntakeFile>,
    #[serde(default)]
    pub experience: Vec<IntakeFile>,
}

/// The expression-of-interest form as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeRequest {
    pub name: String,
    pub email: String,
    pub agency_name: String,
    pub country: String,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub pending_files: IntakeFiles,
}

/// Validates the request, decodes every payload and persists the new
/// submission as `pending`. Returns the generated submission id.
pub fn accept<S: SubmissionStore>(store: &S, request: IntakeRequest) -> Result<String, IntakeError> {
    validate(&request)?;

    let pending_files = PendingFiles {
        credentials: decode_files(request.pending_files.credentials)?,
        experience: decode_files(request.pending_files.experience)?,
    };

    let submission = Submission::new(
        request.name,
        request.email,
        request.agency_name,
        request.country,
        request.credentials,
        request.opportunities,
        pending_files,
    );

    store.create(&submission)?;
    info!(
        submission_id = %submission.id,
        files = submission.pending_files.total(),
        "Accepted submission"
    );
    Ok(submission.id)
}

fn validate(request: &IntakeRequest) -> Result<(), IntakeError> {
    if request.name.trim().is_empty() {
        return Err(IntakeError::MissingField("name"));
    }
    if request.email.trim().is_empty() {
        return Err(IntakeError::MissingField("email"));
    }
    if request.agency_name.trim().is_empty() {
        return Err(IntakeError::MissingField("agency_name"));
    }
    if request.country.trim().is_empty() {
        return Err(IntakeError::MissingField("country"));
    }

    // Minimal shape check; real deliverability is the mail provider's
    // problem.
    let email = request.email.trim();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid {
        return Err(IntakeError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

fn decode_files(files: Vec<IntakeFile>) -> Result<Vec<PendingFile>, IntakeError> {
    files
        .into_iter()
        .map(|file| {
            if file.filename.trim().is_empty() {
                return Err(IntakeError::EmptyFilename);
            }
            let bytes =
                STANDARD
                    .decode(file.base64.as_bytes())
                    .map_err(|source| IntakeError::InvalidPayload {
                        filename: file.filename.clone(),
                        source,
                    })?;
            let mime_type = file
                .mime
                .filter(|m| !m.trim().is_empty())
                .or_else(|| detect_mime(&file.filename))
                .unwrap_or_else(|| DEFAULT_MIME.to_string());
            Ok(PendingFile {
                bytes,
                filename: file.filename,
                mime_type,
            })
        })
        .collect()
}

/// Detects MIME type from the filename using the mime_guess crate.
/// Returns `None` for unknown extensions.
fn detect_mime(filename: &str) -> Option<String> {
    mime_guess::from_path(filename).first().map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::SqliteStore;
    use crate::submission::SubmissionStatus;

    fn test_store() -> SqliteStore {
        SqliteStore::new(Database::open_in_memory().unwrap())
    }

    fn sample_request() -> IntakeRequest {
        IntakeRequest {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            agency_name: "Acme Consulting".to_string(),
            country: "Switzerland".to_string(),
            opportunities: vec!["infrastructure".to_string()],
            credentials: "10 years of practice".to_string(),
            pending_files: IntakeFiles {
                credentials: vec![IntakeFile {
                    base64: STANDARD.encode(b"deck bytes"),
                    filename: "deck.pdf".to_string(),
                    mime: Some("application/pdf".to_string()),
                }],
                experience: vec![IntakeFile {
                    base64: STANDARD.encode(b"cv bytes"),
                    filename: "cv.png".to_string(),
                    mime: None,
                }],
            },
        }
    }

    #[test]
    fn test_accept_persists_pending_submission() {
        let store = test_store();
        let id = accept(&store, sample_request()).unwrap();

        let stored = store.find(&id).unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);
        assert_eq!(stored.name, "Jane Doe");
        assert_eq!(stored.pending_files.credentials.len(), 1);
        assert_eq!(stored.pending_files.credentials[0].bytes, b"deck bytes");
        assert_eq!(stored.pending_files.experience.len(), 1);
        assert!(stored.uploaded_files.is_empty());
    }

    #[test]
    fn test_mime_detected_from_extension_when_omitted() {
        let store = test_store();
        let id = accept(&store, sample_request()).unwrap();

        let stored = store.find(&id).unwrap().unwrap();
        assert_eq!(stored.pending_files.experience[0].mime_type, "image/png");
    }

    #[test]
    fn test_mime_falls_back_to_octet_stream() {
        let store = test_store();
        let mut request = sample_request();
        request.pending_files.experience[0].filename = "notes.xyz123".to_string();
        let id = accept(&store, request).unwrap();

        let stored = store.find(&id).unwrap().unwrap();
        assert_eq!(
            stored.pending_files.experience[0].mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_missing_name_rejected() {
        let store = test_store();
        let mut request = sample_request();
        request.name = "  ".to_string();
        let err = accept(&store, request).unwrap_err();
        assert!(matches!(err, IntakeError::MissingField("name")));
    }

    #[test]
    fn test_bad_email_rejected() {
        let store = test_store();
        for bad in ["not-an-email", "@nodomain.com", "user@nodot"] {
            let mut request = sample_request();
            request.email = bad.to_string();
            let err = accept(&store, request).unwrap_err();
            assert!(matches!(err, IntakeError::InvalidEmail(_)), "{}", bad);
        }
    }

    #[test]
    fn test_bad_base64_rejected_wholesale() {
        let store = test_store();
        let mut request = sample_request();
        request.pending_files.credentials[0].base64 = "%%not-base64%%".to_string();
        let err = accept(&store, request).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidPayload { .. }));

        // Nothing was persisted.
        assert_eq!(store.count_by_status(SubmissionStatus::Pending).unwrap(), 0);
    }

    #[test]
    fn test_empty_filename_rejected() {
        let store = test_store();
        let mut request = sample_request();
        request.pending_files.experience[0].filename = String::new();
        let err = accept(&store, request).unwrap_err();
        assert!(matches!(err, IntakeError::EmptyFilename));
    }

    #[test]
    fn test_wire_format_deserializes() {
        let json = r#"{
            "name": "Jane Doe",
            "email": "jane@example.com",
            "agency_name": "Acme Consulting",
            "country": "Switzerland",
            "opportunities": ["infrastructure"],
            "credentials": "10 years",
            "pending_files": {
                "credentials": [
                    {"base64": "aGVsbG8=", "filename": "deck.pdf", "mime": "application/pdf"}
                ],
                "experience": []
            }
        }"#;

        let request: IntakeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.pending_files.credentials.len(), 1);

        let store = test_store();
        let id = accept(&store, request).unwrap();
        let stored = store.find(&id).unwrap().unwrap();
        assert_eq!(stored.pending_files.credentials[0].bytes, b"hello");
    }
}
