use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{AcuTraceError, Result};
use crate::time_utils::{get_system_timezone, TimezoneHandler};

/// Default base URL of the analysis service.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path appended to the base URL for batched uploads.
pub const ANALYZE_ENDPOINT: &str = "/api/analyze/multi";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Party ledger and fund flow analysis session client
#[derive(Parser, Debug, Clone)]
#[command(
    name = "acutrace",
    about = "Party ledger and fund flow analysis session client",
    version
)]
pub struct Settings {
    /// Base URL of the analysis service
    #[arg(long, env = "ACUTRACE_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Timezone used for date filters (auto-detected if not specified)
    #[arg(long, env = "ACUTRACE_TIMEZONE", default_value = "auto", global = true)]
    pub timezone: String,

    /// Session file (defaults to ~/.acutrace/session.json)
    #[arg(long, env = "ACUTRACE_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"], global = true)]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and persist the session
    Login {
        /// User ID
        #[arg(long)]
        user: String,
        /// Password
        #[arg(long, env = "ACUTRACE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show authentication state and the stored analysis
    Status,
    /// Upload statements to the analysis service and store the result
    Analyze {
        /// Statement files (XLS, XLSX or PDF)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Force the upload mode instead of inferring it from the file count
        #[arg(long, value_parser = ["single", "multi"])]
        mode: Option<String>,
    },
    /// Load a saved analysis response into the session
    Load {
        /// JSON file holding the service response
        path: PathBuf,
        /// Upload mode recorded in the payload metadata
        #[arg(long, default_value = "single", value_parser = ["single", "multi"])]
        mode: String,
        /// Number of source files recorded in the payload metadata
        #[arg(long, default_value = "1")]
        files: u64,
    },
    /// Print credit, debit and net flow for the filtered transactions
    Summary(FilterArgs),
    /// Export the filtered view
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format
        #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
        format: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Transaction filter options shared by `summary` and `export`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct FilterArgs {
    /// Transaction type
    #[arg(long = "type", default_value = "all", value_parser = ["all", "credit", "debit", "transfer", "upi"])]
    pub kind: String,

    /// Case-insensitive party substring
    #[arg(long)]
    pub party: Option<String>,

    /// Case-insensitive narration substring
    #[arg(long)]
    pub search: Option<String>,

    /// Date bucket
    #[arg(long, default_value = "all", value_parser = ["all", "today", "thisWeek", "thisMonth", "lastMonth"])]
    pub date: String,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        Self::resolve_auto_values(Settings::parse_from(args))
    }

    /// Fallible variant of [`Settings::load_from_args`].
    pub fn try_load_from_args(args: Vec<std::ffi::OsString>) -> std::result::Result<Self, clap::Error> {
        Settings::try_parse_from(args).map(Self::resolve_auto_values)
    }

    /// Location of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        match &self.session_file {
            Some(path) => path.clone(),
            None => Self::default_session_path_in(
                &dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            ),
        }
    }

    /// Default session path rooted at `base_dir` (used for testing).
    pub fn default_session_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".acutrace").join("session.json")
    }

    /// Full upload URL: base URL without trailing slash plus the endpoint.
    pub fn analyze_url(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), ANALYZE_ENDPOINT)
    }

    /// Reject values that would only fail later: an unknown timezone or an
    /// API URL that is not HTTP(S).
    pub fn validate(&self) -> Result<()> {
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(AcuTraceError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(AcuTraceError::Config(format!(
                "API URL must start with http:// or https://, got \"{}\"",
                self.api_url
            )));
        }
        Ok(())
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            let detected = get_system_timezone();
            settings.timezone = if TimezoneHandler::validate_timezone(&detected) {
                detected
            } else {
                "UTC".to_string()
            };
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("acutrace")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_parse_status_defaults() {
        let settings = Settings::load_from_args(args(&["--timezone", "UTC", "status"]));
        assert_eq!(settings.command, Command::Status);
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_auto_timezone_is_resolved() {
        let settings = Settings::load_from_args(args(&["status"]));
        assert_ne!(settings.timezone, "auto");
        assert!(!settings.timezone.is_empty());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings = Settings::load_from_args(args(&["--debug", "--timezone", "UTC", "logout"]));
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_parse_login() {
        let settings = Settings::load_from_args(args(&[
            "login",
            "--user",
            "admin",
            "--password",
            "secret",
        ]));
        assert_eq!(
            settings.command,
            Command::Login {
                user: "admin".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_export_with_filters() {
        let settings = Settings::load_from_args(args(&[
            "export",
            "--format",
            "csv",
            "--type",
            "upi",
            "--party",
            "ravi",
            "--date",
            "lastMonth",
        ]));
        match settings.command {
            Command::Export {
                filters, format, ..
            } => {
                assert_eq!(format, "csv");
                assert_eq!(filters.kind, "upi");
                assert_eq!(filters.party.as_deref(), Some("ravi"));
                assert_eq!(filters.date, "lastMonth");
                assert!(filters.search.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_filter_value_rejected() {
        let result = Settings::try_load_from_args(args(&["summary", "--type", "cash"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_analyze_url_trims_trailing_slash() {
        let settings = Settings::load_from_args(args(&[
            "--api-url",
            "http://10.0.0.5:8000/",
            "--timezone",
            "UTC",
            "status",
        ]));
        assert_eq!(settings.analyze_url(), "http://10.0.0.5:8000/api/analyze/multi");
    }

    #[test]
    fn test_parse_analyze() {
        let settings = Settings::load_from_args(args(&["analyze", "jan.pdf", "feb.xlsx"]));
        assert_eq!(
            settings.command,
            Command::Analyze {
                files: vec![PathBuf::from("jan.pdf"), PathBuf::from("feb.xlsx")],
                mode: None,
            }
        );
        assert!(Settings::try_load_from_args(args(&["analyze"])).is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let settings = Settings::load_from_args(args(&["status"]));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let settings = Settings::load_from_args(args(&["--timezone", "Mars/Olympus", "status"]));
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AcuTraceError::Config(_)));
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn test_validate_rejects_non_http_api_url() {
        let settings = Settings::load_from_args(args(&[
            "--api-url",
            "ftp://files.local",
            "--timezone",
            "UTC",
            "status",
        ]));
        assert!(matches!(settings.validate(), Err(AcuTraceError::Config(_))));
    }

    #[test]
    fn test_session_path_override_and_default() {
        let settings = Settings::load_from_args(args(&[
            "--session-file",
            "/tmp/s.json",
            "--timezone",
            "UTC",
            "status",
        ]));
        assert_eq!(settings.session_path(), PathBuf::from("/tmp/s.json"));

        let base = std::path::Path::new("/home/analyst");
        assert_eq!(
            Settings::default_session_path_in(base),
            PathBuf::from("/home/analyst/.acutrace/session.json")
        );
    }
}
