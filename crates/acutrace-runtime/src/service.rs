//! Boundary to the remote analysis service.
//!
//! The service receives every selected statement in one multipart POST and
//! answers with the analysis document. The request/response contract lives
//! here; [`crate::http_client`] talks to the real service.

use async_trait::async_trait;
use acutrace_core::error::TransportError;

/// Multipart field name under which every file is attached.
pub const MULTIPART_FIELD: &str = "files";

/// One file of a batched upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A single batched upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    /// Absolute URL the batch is POSTed to.
    pub endpoint: String,
    pub field_name: &'static str,
    pub files: Vec<FilePart>,
}

impl UploadBatch {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }
}

/// Status and raw body of the service's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
}

impl ServiceResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Send one batch and wait for the answer. A non-2xx answer is still a
    /// `ServiceResponse`; only failures to get an answer at all are errors.
    async fn analyze(&self, batch: UploadBatch) -> Result<ServiceResponse, TransportError>;
}

/// MIME type for an accepted statement extension (case-insensitive).
pub fn mime_type_for(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
