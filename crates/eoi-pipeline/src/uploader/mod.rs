//! Blob uploader contract.
//!
//! One payload in, one stable external reference out. Uploads are not
//! content-addressed: retrying after a partial failure can leave a
//! duplicate object in external storage for a file that was actually
//! stored just before the crash. That is an accepted limitation; the
//! durable `uploaded_files` list, not external storage, is the record of
//! truth.

use thiserror::Error;

mod http;

pub use http::HttpBlobUploader;
pub(crate) use http::truncate_body;

/// One upload: the payload plus the metadata the external store wants.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    pub mime_type: &'a str,
    /// Submitter name, used by the external store for object labeling.
    pub owner_name: &'a str,
    /// Submitter organization, same purpose.
    pub owner_org: &'a str,
}

/// Stable reference to an externally stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    pub url: String,
    pub external_id: String,
}

/// Typed upload failures. The processor treats every variant as fatal for
/// the invocation, but the distinction survives into `error_message` so
/// operators can tell a network blip from bad credentials.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload transport failure: {0}")]
    Network(String),

    #[error("Upload rejected by storage auth (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    #[error("Storage quota exceeded (HTTP {status}): {detail}")]
    Quota { status: u16, detail: String },

    #[error("Storage rejected payload '{filename}': {detail}")]
    RejectedPayload { filename: String, detail: String },

    #[error("Unexpected storage response (HTTP {status}): {detail}")]
    UnexpectedResponse { status: u16, detail: String },
}

/// Uploads one binary payload to external object storage.
///
/// Implementations must surface failures as typed errors rather than
/// silent empty results; the processor depends on the error to decide
/// whether the invocation failed.
pub trait BlobUploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadedBlob, UploadError>;
}
