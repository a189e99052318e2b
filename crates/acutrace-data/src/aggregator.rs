//! Credit, debit and net-flow totals over a transaction sequence.
//!
//! The caller decides which sequence to pass: the full payload for the
//! overview cards, or the filtered view for exports.

use acutrace_core::models::{AnalysisPayload, TransactionRecord};
use serde::Serialize;

// ── FlowTotals ────────────────────────────────────────────────────────────────

/// Money in, money out and the difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowTotals {
    pub total_credit: f64,
    pub total_debit: f64,
    pub net_flow: f64,
}

impl FlowTotals {
    /// Add one transaction to the running totals.
    pub fn add_transaction(&mut self, txn: &TransactionRecord) {
        self.total_credit += finite_or_zero(txn.credit);
        self.total_debit += finite_or_zero(txn.debit);
        self.net_flow = self.total_credit - self.total_debit;
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Sum credit and debit in one pass. Empty input yields all zeros.
pub fn calculate_totals(transactions: &[TransactionRecord]) -> FlowTotals {
    transactions
        .iter()
        .fold(FlowTotals::default(), |mut totals, txn| {
            totals.add_transaction(txn);
            totals
        })
}

/// Headline numbers for the overview cards, always over the full payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverviewStats {
    pub transaction_count: usize,
    pub party_count: usize,
    pub chain_count: u64,
    #[serde(flatten)]
    pub totals: FlowTotals,
}

impl OverviewStats {
    pub fn from_payload(payload: &AnalysisPayload) -> Self {
        Self {
            transaction_count: payload.transactions.len(),
            party_count: payload.party_ledger.len(),
            chain_count: payload.fund_flow_chains.chain_count(),
            totals: calculate_totals(&payload.transactions),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
