//! Email delivery over a transactional-mail HTTP API.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::submission::Submission;
use crate::uploader::truncate_body;

use super::{format_body, format_subject, Notifier, NotifyError};

#[derive(Serialize)]
struct SendBody<'a> {
    to: &'a str,
    from: &'a str,
    subject: String,
    text: String,
}

/// Notifier that posts the formatted message to a mail-provider endpoint.
pub struct EmailNotifier {
    client: Client,
    endpoint: String,
    token: SecretString,
    recipient: String,
    sender: String,
}

impl EmailNotifier {
    /// Builds the notifier. Credentials and addressing are injected up
    /// front so the processor stays free of ambient configuration.
    pub fn new(
        endpoint: String,
        token: SecretString,
        recipient: String,
        sender: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token,
            recipient,
            sender,
        })
    }
}

impl Notifier for EmailNotifier {
    fn send(&self, submission: &Submission) -> Result<(), NotifyError> {
        let body = SendBody {
            to: &self.recipient,
            from: &self.sender,
            subject: format_subject(submission),
            text: format_body(submission),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = truncate_body(&response.text().unwrap_or_default());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NotifyError::Auth {
                status: status.as_u16(),
                detail,
            }),
            _ => Err(NotifyError::Rejected {
                status: status.as_u16(),
                detail,
            }),
        }
    }
}
