use std::path::PathBuf;
use thiserror::Error;

/// A file selection was rejected before anything was sent to the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Submit was attempted with an empty selection.
    #[error("Please select at least one file")]
    NoFilesSelected,

    /// The file extension is not one of `xls`, `xlsx` or `pdf`.
    #[error("Unsupported file type for {0}: please upload XLS/XLSX or PDF files only")]
    UnsupportedFileType(String),
}

/// The analysis service could not be reached or answered with a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("Network failure: {0}")]
    Network(String),

    /// The service answered with a non-2xx status code.
    #[error("Backend returned error (HTTP {0})")]
    Status(u16),
}

/// The service answered successfully but the body is not a usable payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataShapeError {
    /// The body is not a JSON document.
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    /// The body is JSON but not an object.
    #[error("Response is not a JSON object")]
    NotAnObject,

    /// The required `transactions` array is absent.
    #[error("No transaction data found")]
    MissingTransactions,
}

/// Access to the session was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Identity or secret did not match; deliberately does not say which.
    #[error("Invalid User ID or Password")]
    InvalidCredentials,

    /// An operation that needs an authenticated session was attempted
    /// without one.
    #[error("Not authenticated")]
    NotAuthenticated,
}

/// All errors produced by AcuTrace.
#[derive(Error, Debug)]
pub enum AcuTraceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An upload was submitted while another one is still in flight.
    #[error("An upload is already in progress")]
    UploadInFlight,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    DataShape(#[from] DataShapeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The persisted session file could not be read or written.
    #[error("Failed to access session file {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// CSV serialisation failed.
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AcuTraceError {
    /// Message suitable for showing to the analyst.
    pub fn user_message(&self) -> String {
        match self {
            AcuTraceError::Transport(TransportError::Network(_)) => {
                "Failed to analyze file(s)".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the AcuTrace crates.
pub type Result<T> = std::result::Result<T, AcuTraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_no_files() {
        let err: AcuTraceError = ValidationError::NoFilesSelected.into();
        assert_eq!(err.to_string(), "Please select at least one file");
    }

    #[test]
    fn test_error_display_unsupported_type() {
        let err = ValidationError::UnsupportedFileType("notes.docx".to_string());
        let msg = err.to_string();
        assert!(msg.contains("notes.docx"));
        assert!(msg.contains("XLS/XLSX or PDF"));
    }

    #[test]
    fn test_error_display_status() {
        let err: AcuTraceError = TransportError::Status(502).into();
        assert_eq!(err.to_string(), "Backend returned error (HTTP 502)");
    }

    #[test]
    fn test_error_display_missing_transactions() {
        let err: AcuTraceError = DataShapeError::MissingTransactions.into();
        assert_eq!(err.to_string(), "No transaction data found");
    }

    #[test]
    fn test_auth_error_is_generic() {
        let msg = AuthError::InvalidCredentials.to_string();
        assert_eq!(msg, "Invalid User ID or Password");
    }

    #[test]
    fn test_error_display_storage() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AcuTraceError::Storage {
            path: PathBuf::from("/tmp/session.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/session.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_network_error_user_message() {
        let err: AcuTraceError = TransportError::Network("connection refused".to_string()).into();
        assert_eq!(err.user_message(), "Failed to analyze file(s)");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AcuTraceError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }
}
