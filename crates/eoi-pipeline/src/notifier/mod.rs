//! Notification contract and message formatting.
//!
//! Called exactly once per submission, at the terminal step: every input
//! field plus the uploaded file links are rendered into one message and
//! handed to an external transport. A send failure must propagate; the
//! processor uses it to decide `done` vs `failed`.

use std::fmt::Write;

use thiserror::Error;

use crate::submission::Submission;

mod email;

pub use email::EmailNotifier;

/// Typed notification failures.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport failure: {0}")]
    Network(String),

    #[error("Notification rejected by mail API (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Mail API auth failure (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },
}

/// Dispatches one completed submission over an external transport.
pub trait Notifier {
    fn send(&self, submission: &Submission) -> Result<(), NotifyError>;
}

/// Subject line for a submission notification.
pub fn format_subject(submission: &Submission) -> String {
    format!(
        "New expression of interest: {} ({})",
        submission.name, submission.agency_name
    )
}

/// Renders the full notification body: every form field in a fixed order,
/// then one line per uploaded file link.
pub fn format_body(submission: &Submission) -> String {
    // writeln! into a String cannot fail; the Results are discarded.
    let mut body = String::new();
    let _ = writeln!(body, "Name: {}", submission.name);
    let _ = writeln!(body, "Email: {}", submission.email);
    let _ = writeln!(body, "Agency: {}", submission.agency_name);
    let _ = writeln!(body, "Country: {}", submission.country);
    let _ = writeln!(body, "Opportunities: {}", submission.opportunities.join(", "));
    let _ = writeln!(body, "Credentials: {}", submission.credentials);

    if submission.uploaded_files.is_empty() {
        let _ = writeln!(body, "\nNo files attached.");
    } else {
        let _ = writeln!(body, "\nUploaded files:");
        for file in &submission.uploaded_files {
            let _ = writeln!(body, "- {}: {}", file.name, file.url);
        }
    }

    body
}
