//! HTTP adapter for the external object store.
//!
//! Posts one JSON document per payload to the storage API with a bearer
//! token and a hard request timeout. Status codes are mapped onto the
//! typed `UploadError` variants.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{BlobUploader, UploadError, UploadRequest, UploadedBlob};

/// Maximum length for error bodies kept in error messages, to avoid
/// flooding logs and the persisted `error_message` column.
const MAX_ERROR_BODY_LENGTH: usize = 200;

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    // External bodies are arbitrary UTF-8; the cut must land on a char
    // boundary or slicing panics mid-invocation.
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}

#[derive(Serialize)]
struct UploadBody<'a> {
    file_name: &'a str,
    mime_type: &'a str,
    owner_name: &'a str,
    owner_org: &'a str,
    content_base64: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
    id: String,
}

/// Blob uploader backed by an HTTP object-storage API.
pub struct HttpBlobUploader {
    client: Client,
    endpoint: String,
    token: SecretString,
}

impl HttpBlobUploader {
    /// Builds the adapter with a per-request timeout. Credentials are
    /// injected here, never read from the environment at call time.
    pub fn new(
        endpoint: String,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }
}

impl BlobUploader for HttpBlobUploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadedBlob, UploadError> {
        let body = UploadBody {
            file_name: request.filename,
            mime_type: request.mime_type,
            owner_name: request.owner_name,
            owner_org: request.owner_org,
            content_base64: STANDARD.encode(request.bytes),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let parsed: UploadResponse = response.json().map_err(|e| {
                UploadError::UnexpectedResponse {
                    status: status.as_u16(),
                    detail: format!("invalid response body: {}", e),
                }
            })?;
            return Ok(UploadedBlob {
                url: parsed.url,
                external_id: parsed.id,
            });
        }

        let detail = truncate_body(&response.text().unwrap_or_default());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(UploadError::Auth {
                status: status.as_u16(),
                detail,
            }),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::INSUFFICIENT_STORAGE => {
                Err(UploadError::Quota {
                    status: status.as_u16(),
                    detail,
                })
            }
            StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                Err(UploadError::RejectedPayload {
                    filename: request.filename.to_string(),
                    detail,
                })
            }
            _ => Err(UploadError::UnexpectedResponse {
                status: status.as_u16(),
                detail,
            }),
        }
    }
}
