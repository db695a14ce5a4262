//! Shared test doubles and builders for the end-to-end tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use eoi_pipeline::db::Database;
use eoi_pipeline::intake::{IntakeFile, IntakeFiles, IntakeRequest};
use eoi_pipeline::notifier::{Notifier, NotifyError};
use eoi_pipeline::uploader::{BlobUploader, UploadError, UploadRequest, UploadedBlob};
use eoi_pipeline::{SqliteStore, Submission, SubmissionProcessor};

/// Uploader double that records uploads and can be told to fail on a
/// specific filename.
#[derive(Clone, Default)]
pub struct RecordingUploader {
    calls: Arc<Mutex<Vec<String>>>,
    fail_on: Arc<Mutex<Option<String>>>,
}

impl RecordingUploader {
    pub fn fail_on(&self, filename: &str) {
        *self.fail_on.lock().unwrap() = Some(filename.to_string());
    }

    pub fn succeed(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl BlobUploader for RecordingUploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadedBlob, UploadError> {
        if self.fail_on.lock().unwrap().as_deref() == Some(request.filename) {
            return Err(UploadError::Network("connection reset".to_string()));
        }
        self.calls.lock().unwrap().push(request.filename.to_string());
        Ok(UploadedBlob {
            url: format!("https://blobs.example/{}", request.filename),
            external_id: format!("ext-{}", request.filename),
        })
    }
}

/// Notifier double that records the submissions it delivered.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn sent_ids(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, submission: &Submission) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(submission.id.clone());
        Ok(())
    }
}

pub type TestProcessor = SubmissionProcessor<SqliteStore, RecordingUploader, RecordingNotifier>;

/// Builds a processor over an in-memory store plus handles to the store
/// and both doubles.
pub fn harness() -> (TestProcessor, SqliteStore, RecordingUploader, RecordingNotifier) {
    let store = SqliteStore::new(Database::open_in_memory().unwrap());
    let uploader = RecordingUploader::default();
    let notifier = RecordingNotifier::default();
    let processor = SubmissionProcessor::new(store.clone(), uploader.clone(), notifier.clone());
    (processor, store, uploader, notifier)
}

/// Builder for intake requests.
pub struct RequestBuilder {
    name: String,
    email: String,
    agency_name: String,
    country: String,
    opportunities: Vec<String>,
    credentials: String,
    credential_files: Vec<IntakeFile>,
    experience_files: Vec<IntakeFile>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            agency_name: "Acme Consulting".to_string(),
            country: "Switzerland".to_string(),
            opportunities: vec!["infrastructure".to_string()],
            credentials: "10 years of practice".to_string(),
            credential_files: vec![],
            experience_files: vec![],
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn credential_file(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.credential_files.push(wire_file(filename, bytes));
        self
    }

    pub fn experience_file(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.experience_files.push(wire_file(filename, bytes));
        self
    }

    pub fn build(self) -> IntakeRequest {
        IntakeRequest {
            name: self.name,
            email: self.email,
            agency_name: self.agency_name,
            country: self.country,
            opportunities: self.opportunities,
            credentials: self.credentials,
            pending_files: IntakeFiles {
                credentials: self.credential_files,
                experience: self.experience_files,
            },
        }
    }
}

fn wire_file(filename: &str, bytes: &[u8]) -> IntakeFile {
    IntakeFile {
        base64: STANDARD.encode(bytes),
        filename: filename.to_string(),
        mime: None,
    }
}
