//! HTTP implementation of [`AnalysisService`].
//!
//! Every file of a batch goes into one `multipart/form-data` POST under the
//! batch's field name. Any answer the server gives, whatever its status, is
//! returned as a [`ServiceResponse`]; only failures to get an answer are
//! mapped to [`TransportError::Network`].

use async_trait::async_trait;
use acutrace_core::error::TransportError;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use crate::service::{AnalysisService, ServiceResponse, UploadBatch};

pub struct HttpAnalysisService {
    client: Client,
}

impl HttpAnalysisService {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build().map_err(network)?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, batch: UploadBatch) -> Result<ServiceResponse, TransportError> {
        let UploadBatch {
            endpoint,
            field_name,
            files,
        } = batch;

        let file_count = files.len();
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(file.mime_type)
                .map_err(network)?;
            form = form.part(field_name, part);
        }

        debug!(endpoint = %endpoint, files = file_count, "posting analysis batch");
        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(network)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(network)?;
        debug!(status, bytes = body.len(), "analysis service answered");
        Ok(ServiceResponse::new(status, body))
    }
}

fn network(error: reqwest::Error) -> TransportError {
    TransportError::Network(error.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
