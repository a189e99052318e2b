use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use acutrace_core::error::DataShapeError;
use acutrace_core::formatting::{format_inr, format_size};
use acutrace_core::models::{AnalysisPayload, UploadMode};
use acutrace_core::settings::{Command, FilterArgs};
use acutrace_core::time_utils::TimezoneHandler;
use acutrace_data::aggregator::{calculate_totals, OverviewStats};
use acutrace_data::export::{render, ExportFormat};
use acutrace_data::filters::{DateBucket, FilterCriteria, FilterEngine, TransactionKind};
use acutrace_data::normalizer::ResultNormalizer;
use acutrace_runtime::auth::AuthState;
use acutrace_runtime::progress::{UploadPhase, UploadProgress};
use acutrace_runtime::service::AnalysisService;
use acutrace_runtime::session::Session;
use acutrace_runtime::upload::{attach_upload_metadata, SelectedFile, UploadConfig, UploadOrchestrator};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Number of fund-flow chains listed by `status`.
const STATUS_CHAIN_LIMIT: usize = 5;

/// What the subcommands need besides the session.
pub struct CommandContext<'a> {
    pub tz: TimezoneHandler,
    pub upload: UploadConfig,
    pub service: &'a dyn AnalysisService,
}

// ── Dispatch ───────────────────────────────────────────────────────────────────

/// Run one subcommand against `session`, writing human output to `out`.
pub async fn run(
    command: &Command,
    session: &mut Session,
    ctx: &CommandContext<'_>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Login { user, password } => {
            session.login(user, password).await?;
            writeln!(out, "Logged in as {}", user)?;
        }
        Command::Logout => {
            session.logout()?;
            writeln!(out, "Logged out")?;
        }
        Command::Status => status(session, out)?,
        Command::Analyze { files, mode } => {
            analyze(session, files, mode.as_deref(), ctx, out).await?
        }
        Command::Load { path, mode, files } => load(session, path, mode, *files, out)?,
        Command::Summary(filters) => summary(session, filters, ctx.tz, out)?,
        Command::Export {
            filters,
            format,
            output,
        } => export(session, filters, format, output.as_deref(), ctx.tz, out)?,
    }
    Ok(())
}

/// Translate CLI filter options into engine criteria.
pub fn filter_criteria(args: &FilterArgs) -> Result<FilterCriteria> {
    Ok(FilterCriteria {
        kind: args.kind.parse::<TransactionKind>().map_err(|e| anyhow!(e))?,
        party: args.party.clone().unwrap_or_default(),
        search: args.search.clone().unwrap_or_default(),
        date: args.date.parse::<DateBucket>().map_err(|e| anyhow!(e))?,
    })
}

// ── Subcommands ────────────────────────────────────────────────────────────────

fn status(session: &Session, out: &mut impl Write) -> Result<()> {
    match session.auth_state() {
        AuthState::Authenticated { user_id } => writeln!(out, "Authenticated as {}", user_id)?,
        _ => {
            writeln!(out, "Not authenticated")?;
            return Ok(());
        }
    }

    let Some(payload) = session.payload()? else {
        writeln!(out, "No analysis loaded")?;
        return Ok(());
    };
    let stats = OverviewStats::from_payload(&payload);
    writeln!(out, "Transactions: {}", stats.transaction_count)?;
    writeln!(out, "Parties:      {}", stats.party_count)?;
    writeln!(out, "Fund flows:   {}", stats.chain_count)?;
    for chain in payload.fund_flow_chains.top_chains.iter().take(STATUS_CHAIN_LIMIT) {
        writeln!(
            out,
            "  {}  {}  {}% {}{}",
            chain.flow_path,
            format_inr(chain.total_amount),
            chain.confidence_percent(),
            chain.confidence_level().as_str(),
            if chain.cross_file { " cross-file" } else { "" }
        )?;
    }
    writeln!(out, "Net flow:     {}", format_inr(stats.totals.net_flow))?;
    if let Some(mode) = payload.metadata.upload_mode {
        writeln!(
            out,
            "Upload:       {} ({} file(s))",
            mode.as_str(),
            payload.metadata.files_count.unwrap_or(1)
        )?;
    }
    Ok(())
}

async fn analyze(
    session: &mut Session,
    paths: &[PathBuf],
    mode: Option<&str>,
    ctx: &CommandContext<'_>,
    out: &mut impl Write,
) -> Result<()> {
    let mut selected = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        selected.push(file);
    }

    let mut orchestrator = UploadOrchestrator::new(ctx.upload.clone());
    let report = orchestrator.add_files(selected)?;
    for rejected in &report.rejected {
        writeln!(out, "Skipped: {}", rejected)?;
    }
    if report.truncated > 0 {
        writeln!(
            out,
            "Only the first {} files are sent; {} dropped",
            ctx.upload.max_files, report.truncated
        )?;
    }
    if let Some(mode) = mode {
        orchestrator.set_mode(mode.parse::<UploadMode>().map_err(|e| anyhow!(e))?);
    }

    for file in orchestrator.files() {
        let kind = if file.is_pdf() { "PDF" } else { "spreadsheet" };
        writeln!(out, "  {} ({}, {})", file.name(), kind, format_size(file.size()))?;
    }
    writeln!(
        out,
        "Uploading {} file(s), {} total",
        orchestrator.files().len(),
        orchestrator.total_size_label()
    )?;

    let reporter = report_progress(orchestrator.subscribe());
    let result = orchestrator.submit(session, ctx.service).await;
    reporter.abort();
    let outcome = result?;

    writeln!(
        out,
        "Analysis complete: {} transactions, {} parties, {} fund flows ({} mode, {} file(s))",
        outcome.payload.transactions.len(),
        outcome.payload.party_ledger.len(),
        outcome.payload.fund_flow_chains.chain_count(),
        outcome.mode.as_str(),
        outcome.files_count
    )?;
    Ok(())
}

fn load(
    session: &mut Session,
    path: &Path,
    mode: &str,
    files: u64,
    out: &mut impl Write,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut raw: Value =
        serde_json::from_str(&text).map_err(|e| DataShapeError::InvalidJson(e.to_string()))?;
    ResultNormalizer::validate(&raw)?;

    let mode = mode.parse::<UploadMode>().map_err(|e| anyhow!(e))?;
    attach_upload_metadata(&mut raw, mode, files as usize);
    let payload = session.store_response(&raw)?;

    writeln!(
        out,
        "Loaded {} transactions, {} parties",
        payload.transactions.len(),
        payload.party_ledger.len()
    )?;
    Ok(())
}

fn summary(
    session: &Session,
    filters: &FilterArgs,
    tz: TimezoneHandler,
    out: &mut impl Write,
) -> Result<()> {
    let payload = require_payload(session)?;
    let criteria = filter_criteria(filters)?;
    let filtered = FilterEngine::new(tz).apply(&payload.transactions, &criteria);
    let totals = calculate_totals(&filtered);

    writeln!(
        out,
        "Transactions: {} of {}",
        filtered.len(),
        payload.transactions.len()
    )?;
    writeln!(out, "Credit:       {}", format_inr(totals.total_credit))?;
    writeln!(out, "Debit:        {}", format_inr(totals.total_debit))?;
    writeln!(out, "Net flow:     {}", format_inr(totals.net_flow))?;
    Ok(())
}

fn export(
    session: &Session,
    filters: &FilterArgs,
    format: &str,
    output: Option<&Path>,
    tz: TimezoneHandler,
    out: &mut impl Write,
) -> Result<()> {
    let payload = require_payload(session)?;
    let format = format.parse::<ExportFormat>().map_err(|e| anyhow!(e))?;
    let criteria = filter_criteria(filters)?;
    let filtered = FilterEngine::new(tz).apply(&payload.transactions, &criteria);
    let rendered = render(format, &payload, &filtered)?;

    match output {
        None => out.write_all(rendered.as_bytes())?,
        Some(target) => {
            let target = export_target(target, format);
            std::fs::write(&target, &rendered)
                .with_context(|| format!("failed to write {}", target.display()))?;
            writeln!(out, "Exported {} transactions to {}", filtered.len(), target.display())?;
        }
    }
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// One line for the phase indicator, `None` while idle.
fn progress_line(progress: &UploadProgress) -> Option<String> {
    let phase = progress.phase?;
    let done = UploadPhase::ALL
        .iter()
        .filter(|p| progress.is_completed(**p))
        .count();
    Some(format!(
        "[{:>3}%] {} ({}/{} steps)",
        progress.percent,
        phase.label(),
        done,
        UploadPhase::ALL.len()
    ))
}

/// Echo indicator changes to stderr until aborted.
fn report_progress(mut rx: watch::Receiver<UploadProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let line = progress_line(&rx.borrow_and_update());
            if let Some(line) = line {
                eprintln!("{line}");
            }
        }
    })
}

fn require_payload(session: &Session) -> Result<Arc<AnalysisPayload>> {
    match session.payload()? {
        Some(payload) => Ok(payload),
        None => bail!("no analysis results in this session; run `acutrace analyze` or `acutrace load` first"),
    }
}

/// A directory target gets the default timestamped file name.
fn export_target(target: &Path, format: ExportFormat) -> PathBuf {
    if target.is_dir() {
        target.join(format.default_file_name(Utc::now()))
    } else {
        target.to_path_buf()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
