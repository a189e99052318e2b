use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data_processors::{
    lenient_amount, lenient_counter, lenient_flag, lenient_optional_amount, lenient_text,
};

/// Separator between party names inside a fund-flow chain path.
pub const FLOW_PATH_SEPARATOR: &str = " -> ";

/// How the files of one upload were meant to be analysed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// One statement analysed on its own.
    #[default]
    Single,
    /// Several statements merged into one analysis.
    Multi,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMode::Single => "single",
            UploadMode::Multi => "multi",
        }
    }
}

impl std::str::FromStr for UploadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(UploadMode::Single),
            "multi" => Ok(UploadMode::Multi),
            other => Err(format!("unknown upload mode: {other}")),
        }
    }
}

/// A single statement line as returned by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction date; the service does not commit to one format.
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    /// Normalised counterparty name.
    #[serde(default, deserialize_with = "lenient_text")]
    pub party: String,
    /// Narration as printed on the statement.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    /// Money in. Missing or non-numeric values read as `0.0`.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub credit: f64,
    /// Money out. Missing or non-numeric values read as `0.0`.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub debit: f64,
    /// Free-form label, e.g. `"UPI Transfer"`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    /// Any other fields attached by the service (balance, source file, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionRecord {
    /// Category for display, `"Transfer"` when the service left it blank.
    pub fn display_type(&self) -> &str {
        if self.category.is_empty() {
            "Transfer"
        } else {
            &self.category
        }
    }

    /// Whichever side of the ledger this line moved; credit wins when both
    /// are set.
    pub fn amount(&self) -> f64 {
        if self.credit > 0.0 {
            self.credit
        } else {
            self.debit
        }
    }
}

/// Per-party aggregate for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartyLedgerEntry {
    /// Unique key within one analysis run.
    #[serde(default, deserialize_with = "lenient_text")]
    pub party_name: String,
    #[serde(default, alias = "credit", deserialize_with = "lenient_amount")]
    pub total_credit: f64,
    #[serde(default, alias = "debit", deserialize_with = "lenient_amount")]
    pub total_debit: f64,
    /// Backend-attached statistics (transaction counts, first/last seen, ...).
    #[serde(flatten)]
    pub statistics: Map<String, Value>,
}

impl PartyLedgerEntry {
    /// Credit minus debit for this party.
    pub fn balance(&self) -> f64 {
        self.total_credit - self.total_debit
    }
}

/// Confidence band used to colour fund-flow chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// An inferred path through which a traced amount moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundFlowChain {
    /// Party names joined by `" -> "`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub flow_path: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: f64,
    /// Score in `[0, 1]`.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub confidence: f64,
    /// Whether the chain links transactions from more than one file.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub cross_file: bool,
    /// Number of source files the chain touches, when reported.
    #[serde(
        default,
        deserialize_with = "lenient_counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FundFlowChain {
    /// The hops of the chain in order. Empty segments are dropped.
    pub fn parties(&self) -> Vec<&str> {
        self.flow_path
            .split(FLOW_PATH_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }

    /// Confidence as a whole percentage, e.g. `0.874` → `87`.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Summary block for fund-flow chains plus the highest-ranked chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundFlowSummary {
    #[serde(
        default,
        deserialize_with = "lenient_counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_chains: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_chain_length: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub cross_file_links: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_chains: Vec<FundFlowChain>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FundFlowSummary {
    /// Reported chain count, falling back to the number of listed chains.
    pub fn chain_count(&self) -> u64 {
        self.total_chains.unwrap_or(self.top_chains.len() as u64)
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount.unwrap_or(0.0)
    }

    pub fn avg_chain_length(&self) -> f64 {
        self.avg_chain_length.unwrap_or(0.0)
    }

    pub fn cross_file_links(&self) -> u64 {
        self.cross_file_links.unwrap_or(0)
    }
}

/// Upload bookkeeping attached to a payload by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_mode: Option<UploadMode>,
    #[serde(
        default,
        deserialize_with = "lenient_counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub files_count: Option<u64>,
    /// Whatever metadata the service itself returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical form of one analysis run.
///
/// Built once per successful upload by the normaliser and replaced wholesale
/// by the next one; it is never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    /// Free-form account holder details.
    #[serde(default = "empty_object")]
    pub account_profile: Value,
    /// Ledger rows in canonical order.
    #[serde(default)]
    pub party_ledger: Vec<PartyLedgerEntry>,
    /// Summary counters that accompanied a wrapped ledger, if any.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub party_ledger_summary: Map<String, Value>,
    #[serde(default)]
    pub fund_flow_chains: FundFlowSummary,
    #[serde(default)]
    pub metadata: AnalysisMetadata,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── TransactionRecord ─────────────────────────────────────────────────

    #[test]
    fn test_transaction_defaults_when_fields_missing() {
        let txn: TransactionRecord = serde_json::from_value(json!({"party": "ACME"})).unwrap();
        assert_eq!(txn.party, "ACME");
        assert_eq!(txn.date, "");
        assert_eq!(txn.credit, 0.0);
        assert_eq!(txn.debit, 0.0);
        assert!(txn.extra.is_empty());
    }

    #[test]
    fn test_transaction_keeps_extra_fields() {
        let txn: TransactionRecord = serde_json::from_value(json!({
            "date": "2024-01-15",
            "credit": 100,
            "balance": 2500.5,
            "source_file": "jan.xlsx"
        }))
        .unwrap();
        assert_eq!(txn.extra.get("balance"), Some(&json!(2500.5)));
        assert_eq!(txn.extra.get("source_file"), Some(&json!("jan.xlsx")));

        let back = serde_json::to_value(&txn).unwrap();
        assert_eq!(back["source_file"], json!("jan.xlsx"));
        assert_eq!(back["credit"], json!(100.0));
    }

    #[test]
    fn test_transaction_display_type() {
        let mut txn = TransactionRecord::default();
        assert_eq!(txn.display_type(), "Transfer");
        txn.category = "UPI".to_string();
        assert_eq!(txn.display_type(), "UPI");
    }

    #[test]
    fn test_transaction_amount_prefers_credit() {
        let txn = TransactionRecord {
            credit: 10.0,
            debit: 3.0,
            ..Default::default()
        };
        assert_eq!(txn.amount(), 10.0);
        let txn = TransactionRecord {
            debit: 3.0,
            ..Default::default()
        };
        assert_eq!(txn.amount(), 3.0);
    }

    // ── PartyLedgerEntry ──────────────────────────────────────────────────

    #[test]
    fn test_ledger_entry_accepts_short_aliases() {
        let entry: PartyLedgerEntry = serde_json::from_value(json!({
            "party_name": "RAVI",
            "credit": 500,
            "debit": "120",
            "transaction_count": 4
        }))
        .unwrap();
        assert_eq!(entry.total_credit, 500.0);
        assert_eq!(entry.total_debit, 120.0);
        assert_eq!(entry.balance(), 380.0);
        assert_eq!(entry.statistics.get("transaction_count"), Some(&json!(4)));
    }

    // ── FundFlowChain ─────────────────────────────────────────────────────

    #[test]
    fn test_chain_parties_split() {
        let chain = FundFlowChain {
            flow_path: "A -> B -> C".to_string(),
            ..Default::default()
        };
        assert_eq!(chain.parties(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_chain_parties_empty_path() {
        let chain = FundFlowChain::default();
        assert!(chain.parties().is_empty());
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.59), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::Medium.as_str(), "medium");
    }

    #[test]
    fn test_chain_cross_file_is_lenient() {
        let chains: Vec<FundFlowChain> = serde_json::from_value(json!([
            {"flow_path": "A -> B", "cross_file": null},
            {"flow_path": "B -> C", "cross_file": 1},
            {"flow_path": "C -> D", "cross_file": "true"},
            {"flow_path": "D -> E"}
        ]))
        .unwrap();
        let flags: Vec<bool> = chains.iter().map(|c| c.cross_file).collect();
        assert_eq!(flags, vec![false, true, true, false]);
    }

    #[test]
    fn test_confidence_percent_rounds_and_clamps() {
        let mut chain = FundFlowChain {
            confidence: 0.874,
            ..Default::default()
        };
        assert_eq!(chain.confidence_percent(), 87);
        chain.confidence = 1.7;
        assert_eq!(chain.confidence_percent(), 100);
    }

    // ── FundFlowSummary ───────────────────────────────────────────────────

    #[test]
    fn test_chain_count_falls_back_to_list_length() {
        let summary: FundFlowSummary = serde_json::from_value(json!({
            "top_chains": [{"flow_path": "A -> B"}, {"flow_path": "B -> C"}]
        }))
        .unwrap();
        assert_eq!(summary.chain_count(), 2);
        assert_eq!(summary.total_amount(), 0.0);
        assert_eq!(summary.cross_file_links(), 0);
    }

    #[test]
    fn test_chain_count_prefers_reported_total() {
        let summary: FundFlowSummary = serde_json::from_value(json!({
            "total_chains": 42,
            "avg_chain_length": 3.5,
            "top_chains": [{"flow_path": "A -> B"}]
        }))
        .unwrap();
        assert_eq!(summary.chain_count(), 42);
        assert!((summary.avg_chain_length() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary_serialises_as_empty_object() {
        let value = serde_json::to_value(FundFlowSummary::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    // ── UploadMode serde ──────────────────────────────────────────────────

    #[test]
    fn test_upload_mode_serde() {
        assert_eq!(serde_json::to_string(&UploadMode::Multi).unwrap(), r#""multi""#);
        let back: UploadMode = serde_json::from_str(r#""single""#).unwrap();
        assert_eq!(back, UploadMode::Single);
        assert_eq!("MULTI".parse::<UploadMode>(), Ok(UploadMode::Multi));
        assert_eq!(UploadMode::Multi.as_str(), "multi");
    }

    // ── AnalysisPayload ───────────────────────────────────────────────────

    #[test]
    fn test_payload_default_profile_is_object() {
        let payload: AnalysisPayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(payload.account_profile, json!({}));
        assert!(payload.transactions.is_empty());
    }
}
