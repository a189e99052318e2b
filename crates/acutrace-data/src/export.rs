//! JSON, clipboard and CSV renderings of the current (filtered) view.

use std::fmt;
use std::io;
use std::str::FromStr;

use acutrace_core::error::{AcuTraceError, Result};
use acutrace_core::models::{AnalysisPayload, FundFlowSummary, PartyLedgerEntry, TransactionRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::aggregator::calculate_totals;

/// Application identifier stamped on every JSON export.
pub const APP_NAME: &str = "AcuTrace";

/// Fixed CSV column order.
pub const CSV_HEADERS: [&str; 7] = [
    "Date",
    "Party",
    "Description",
    "Credit",
    "Debit",
    "Type",
    "Category",
];

// ── ExportFormat ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Download name, e.g. `acutrace_analysis_1710500000000.json`.
    pub fn default_file_name(&self, now: DateTime<Utc>) -> String {
        match self {
            ExportFormat::Json => format!("acutrace_analysis_{}.json", now.timestamp_millis()),
            ExportFormat::Csv => format!("acutrace_transactions_{}.csv", now.timestamp_millis()),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

// ── ExportEnvelope ────────────────────────────────────────────────────────────

/// Summary block of a JSON export. Money figures cover the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub total_transactions: usize,
    pub unique_parties: usize,
    pub fund_flow_chains: u64,
    pub total_credit: f64,
    pub total_debit: f64,
    pub net_flow: f64,
}

/// Everything a JSON export or clipboard copy contains.
#[derive(Debug, Clone, Serialize)]
pub struct ExportEnvelope<'a> {
    pub app: &'static str,
    /// ISO 8601 with millisecond precision, UTC.
    pub generated_at: String,
    pub summary: ExportSummary,
    pub account_profile: &'a Value,
    pub transactions: &'a [TransactionRecord],
    pub party_ledger: &'a [PartyLedgerEntry],
    pub fund_flow_chains: &'a FundFlowSummary,
}

impl<'a> ExportEnvelope<'a> {
    pub fn new(
        payload: &'a AnalysisPayload,
        filtered: &'a [TransactionRecord],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let totals = calculate_totals(filtered);
        Self {
            app: APP_NAME,
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: ExportSummary {
                total_transactions: filtered.len(),
                unique_parties: payload.party_ledger.len(),
                fund_flow_chains: payload.fund_flow_chains.chain_count(),
                total_credit: totals.total_credit,
                total_debit: totals.total_debit,
                net_flow: totals.net_flow,
            },
            account_profile: &payload.account_profile,
            transactions: filtered,
            party_ledger: &payload.party_ledger,
            fund_flow_chains: &payload.fund_flow_chains,
        }
    }

    /// Two-space indented JSON. Download and clipboard share this exact text.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Renderers ─────────────────────────────────────────────────────────────────

/// JSON export of the filtered view, stamped with the current time.
pub fn export_json(payload: &AnalysisPayload, filtered: &[TransactionRecord]) -> Result<String> {
    ExportEnvelope::new(payload, filtered, Utc::now()).to_pretty_json()
}

/// Clipboard text for the filtered view; the same document as
/// [`export_json`].
pub fn clipboard_text(envelope: &ExportEnvelope<'_>) -> Result<String> {
    envelope.to_pretty_json()
}

/// CSV of the filtered transactions only.
///
/// The header row is bare. In data rows every text column is wrapped in
/// quotes with embedded quotes doubled, even when it looks like a number,
/// while credit and debit stay bare numbers. Records end in `\n`.
pub fn export_csv(transactions: &[TransactionRecord]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for txn in transactions {
        writer.write_record([
            quote_text(&txn.date),
            quote_text(&txn.party),
            quote_text(&txn.description),
            format_number(txn.credit),
            format_number(txn.debit),
            quote_text(txn.display_type()),
            quote_text(&txn.category),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AcuTraceError::Io(e.into_error()))?;

    debug!(rows = transactions.len(), bytes = bytes.len(), "CSV export rendered");
    String::from_utf8(bytes).map_err(|e| AcuTraceError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Render the filtered view in `format`.
pub fn render(
    format: ExportFormat,
    payload: &AnalysisPayload,
    filtered: &[TransactionRecord],
) -> Result<String> {
    match format {
        ExportFormat::Json => export_json(payload, filtered),
        ExportFormat::Csv => export_csv(filtered),
    }
}

/// Quoted CSV field; the writer runs with quoting off, so escaping happens here.
fn quote_text(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Bare decimal without a trailing `.0`; non-finite values become `0`.
fn format_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "0".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
