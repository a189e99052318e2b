mod bootstrap;
mod commands;

use acutrace_core::settings::Settings;
use acutrace_core::time_utils::TimezoneHandler;
use acutrace_runtime::http_client::HttpAnalysisService;
use acutrace_runtime::session::Session;
use acutrace_runtime::storage::SessionStorage;
use acutrace_runtime::upload::UploadConfig;
use anyhow::Result;

use commands::CommandContext;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;
    if let Err(e) = settings.validate() {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(2);
    }

    let session_path = settings.session_path();
    bootstrap::ensure_session_dir(&session_path)?;

    tracing::info!("AcuTrace v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        api = %settings.analyze_url(),
        timezone = %settings.timezone,
        session = %session_path.display(),
        "settings resolved"
    );

    let storage = SessionStorage::open(&session_path)?;
    let mut session = Session::with_defaults(storage);
    let service = HttpAnalysisService::new()?;
    let ctx = CommandContext {
        tz: TimezoneHandler::new(&settings.timezone),
        upload: UploadConfig::new(settings.analyze_url()),
        service: &service,
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = commands::run(&settings.command, &mut session, &ctx, &mut stdout).await {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {}", user_facing(&e));
        std::process::exit(1);
    }

    Ok(())
}

/// Prefer the library's analyst-facing wording when the error came from it.
fn user_facing(error: &anyhow::Error) -> String {
    match error.downcast_ref::<acutrace_core::error::AcuTraceError>() {
        Some(e) => e.user_message(),
        None => format!("{:#}", error),
    }
}
