//! Upload orchestration: file selection, one batched request, and hand-off
//! of the result to the session.
//!
//! `Idle -> Selecting -> Uploading -> {Complete, Failed}`; the next selection
//! action after `Failed` returns to `Selecting` with the selection intact.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use acutrace_core::error::{
    AcuTraceError, AuthError, DataShapeError, Result, TransportError, ValidationError,
};
use acutrace_core::formatting::format_size;
use acutrace_core::models::{AnalysisPayload, UploadMode};
use acutrace_core::settings::{ANALYZE_ENDPOINT, DEFAULT_API_URL};
use acutrace_data::normalizer::ResultNormalizer;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::progress::{PhaseTicker, UploadPhase, UploadProgress};
use crate::service::{mime_type_for, AnalysisService, FilePart, UploadBatch, MULTIPART_FIELD};
use crate::session::Session;

/// Most files one selection may hold.
pub const MAX_FILES: usize = 20;

// ── UploadConfig ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Full URL the batch is POSTed to.
    pub endpoint: String,
    pub max_files: usize,
    /// Interval between cosmetic phase steps.
    pub phase_interval: Duration,
    /// Pause between storing the result and handing control on.
    pub handoff_delay: Duration,
}

impl UploadConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("{DEFAULT_API_URL}{ANALYZE_ENDPOINT}"),
            max_files: MAX_FILES,
            phase_interval: Duration::from_millis(700),
            handoff_delay: Duration::from_millis(1500),
        }
    }
}

// ── SelectedFile ──────────────────────────────────────────────────────────────

/// A candidate statement file and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, named after its last path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// MIME type, or `None` when the extension is not accepted.
    pub fn mime_type(&self) -> Option<&'static str> {
        self.extension().as_deref().and_then(mime_type_for)
    }

    pub fn is_pdf(&self) -> bool {
        self.extension().as_deref() == Some("pdf")
    }

    /// Accept only `xls`, `xlsx` and `pdf`, ignoring case.
    pub fn validate(&self) -> std::result::Result<&'static str, ValidationError> {
        self.mime_type()
            .ok_or_else(|| ValidationError::UnsupportedFileType(self.name.clone()))
    }

    fn to_part(&self, mime_type: &'static str) -> FilePart {
        FilePart {
            file_name: self.name.clone(),
            mime_type,
            bytes: self.bytes.to_vec(),
        }
    }
}

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Selecting,
    Uploading,
    Complete,
    Failed { message: String },
}

/// What one `add_files` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub accepted: usize,
    pub rejected: Vec<ValidationError>,
    /// Accepted files dropped because the selection was full.
    pub truncated: usize,
}

/// Result of a successful upload, handed to whatever shows the results.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub payload: Arc<AnalysisPayload>,
    pub mode: UploadMode,
    pub files_count: usize,
}

// ── UploadOrchestrator ────────────────────────────────────────────────────────

/// Drives a single upload at a time.
///
/// If a [`UploadOrchestrator::submit`] future is dropped before it
/// finishes, call [`UploadOrchestrator::cancel`] to leave the `Uploading`
/// state.
pub struct UploadOrchestrator {
    config: UploadConfig,
    state: UploadState,
    files: Vec<SelectedFile>,
    mode: UploadMode,
    progress: Arc<watch::Sender<UploadProgress>>,
    ticker: Option<PhaseTicker>,
}

impl UploadOrchestrator {
    pub fn new(config: UploadConfig) -> Self {
        let (tx, _rx) = watch::channel(UploadProgress::idle());
        Self {
            config,
            state: UploadState::Idle,
            files: Vec::new(),
            mode: UploadMode::default(),
            progress: Arc::new(tx),
            ticker: None,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: UploadMode) {
        self.mode = mode;
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(SelectedFile::size).sum()
    }

    /// Human-readable size of the whole selection.
    pub fn total_size_label(&self) -> String {
        format_size(self.total_size())
    }

    /// Watch the cosmetic phase indicator.
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> UploadProgress {
        *self.progress.borrow()
    }

    /// Append files to the selection in order.
    ///
    /// Files with an unsupported extension are reported and skipped; if
    /// every candidate is rejected the call fails. The selection keeps its
    /// first `max_files` entries. Accepting more than one file at once
    /// switches to multi-file mode.
    pub fn add_files(&mut self, candidates: Vec<SelectedFile>) -> Result<AddReport> {
        self.ensure_not_uploading()?;
        if candidates.is_empty() {
            return Ok(AddReport::default());
        }

        let mut report = AddReport::default();
        let mut accepted = Vec::with_capacity(candidates.len());
        for file in candidates {
            match file.validate() {
                Ok(_) => accepted.push(file),
                Err(e) => {
                    debug!(file = %file.name(), "rejected file");
                    report.rejected.push(e);
                }
            }
        }

        if accepted.is_empty() {
            return Err(report.rejected.swap_remove(0).into());
        }
        if accepted.len() > 1 {
            self.mode = UploadMode::Multi;
        }

        let room = self.config.max_files.saturating_sub(self.files.len());
        report.accepted = accepted.len().min(room);
        report.truncated = accepted.len() - report.accepted;
        self.files.extend(accepted.into_iter().take(room));
        if report.truncated > 0 {
            warn!(dropped = report.truncated, max = self.config.max_files, "selection full; extra files dropped");
        }

        self.state = UploadState::Selecting;
        Ok(report)
    }

    /// Remove the file at `index`; out-of-range indexes are ignored.
    pub fn remove_file(&mut self, index: usize) -> Result<Option<SelectedFile>> {
        self.ensure_not_uploading()?;
        if index >= self.files.len() {
            return Ok(None);
        }
        let removed = self.files.remove(index);
        self.state = if self.files.is_empty() {
            UploadState::Idle
        } else {
            UploadState::Selecting
        };
        Ok(Some(removed))
    }

    /// Send the whole selection as one batch and store the result in
    /// `session`.
    ///
    /// Nothing is sent when the selection is empty, the session is not
    /// authenticated, or another upload is in flight. On failure the
    /// indicator resets to zero and the selection is kept for a retry.
    pub async fn submit(
        &mut self,
        session: &mut Session,
        service: &dyn AnalysisService,
    ) -> Result<UploadOutcome> {
        self.ensure_not_uploading()?;
        if self.files.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }
        if !session.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }
        let batch = self.build_batch()?;

        self.state = UploadState::Uploading;
        self.ticker = Some(PhaseTicker::start(
            Arc::clone(&self.progress),
            self.config.phase_interval,
        ));
        info!(files = batch.files.len(), bytes = batch.total_bytes(), mode = self.mode.as_str(), "upload started");

        let files_count = self.files.len();
        let result = match Self::request(service, batch).await {
            Ok(mut raw) => {
                attach_upload_metadata(&mut raw, self.mode, files_count);
                session.store_response(&raw)
            }
            Err(e) => Err(e),
        };
        self.stop_ticker();

        match result {
            Ok(payload) => {
                self.progress.send_replace(UploadProgress::at(UploadPhase::Complete));
                info!(transactions = payload.transactions.len(), "upload complete");
                tokio::time::sleep(self.config.handoff_delay).await;
                self.state = UploadState::Complete;
                Ok(UploadOutcome {
                    payload,
                    mode: self.mode,
                    files_count,
                })
            }
            Err(e) => {
                self.progress.send_replace(UploadProgress::idle());
                warn!(error = %e, "upload failed");
                self.state = UploadState::Failed {
                    message: e.user_message(),
                };
                Err(e)
            }
        }
    }

    /// Abandon an in-flight upload and reset the indicator.
    pub fn cancel(&mut self) {
        self.stop_ticker();
        self.progress.send_replace(UploadProgress::idle());
        if self.state == UploadState::Uploading {
            self.state = if self.files.is_empty() {
                UploadState::Idle
            } else {
                UploadState::Selecting
            };
            debug!("upload cancelled");
        }
    }

    // ── Private implementation ────────────────────────────────────────────

    fn ensure_not_uploading(&self) -> Result<()> {
        if self.state == UploadState::Uploading {
            Err(AcuTraceError::UploadInFlight)
        } else {
            Ok(())
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn build_batch(&self) -> Result<UploadBatch> {
        let files = self
            .files
            .iter()
            .map(|f| f.validate().map(|mime| f.to_part(mime)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(UploadBatch {
            endpoint: self.config.endpoint.clone(),
            field_name: MULTIPART_FIELD,
            files,
        })
    }

    /// Exactly one service call; returns the validated response document.
    async fn request(service: &dyn AnalysisService, batch: UploadBatch) -> Result<Value> {
        let response = service.analyze(batch).await?;
        if !response.is_success() {
            return Err(TransportError::Status(response.status).into());
        }
        let raw: Value = serde_json::from_str(&response.body)
            .map_err(|e| DataShapeError::InvalidJson(e.to_string()))?;
        ResultNormalizer::validate(&raw)?;
        Ok(raw)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Record how the payload was produced in its `metadata` object, keeping
/// whatever metadata the service sent.
pub fn attach_upload_metadata(raw: &mut Value, mode: UploadMode, files_count: usize) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };
    let metadata = obj
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Some(meta) = metadata.as_object_mut() {
        meta.insert("upload_mode".to_string(), Value::from(mode.as_str()));
        meta.insert("files_count".to_string(), Value::from(files_count as u64));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
