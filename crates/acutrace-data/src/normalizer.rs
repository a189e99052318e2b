//! Reconciles the response shapes the analysis service is known to produce
//! into one canonical [`AnalysisPayload`].

use std::cmp::Ordering;

use acutrace_core::error::DataShapeError;
use acutrace_core::models::{
    AnalysisMetadata, AnalysisPayload, FundFlowChain, FundFlowSummary, PartyLedgerEntry,
    TransactionRecord,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ── LedgerShape ───────────────────────────────────────────────────────────────

/// The accepted layouts of the `party_ledger` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerShape {
    /// A plain ordered array of ledger rows.
    Sequence,
    /// `{ "parties": [...], "total_parties": n, "statistics": {...} }`.
    Wrapped,
    /// `{ "<party name>": { ...ledger fields } }`.
    Keyed,
    /// Field absent, `null`, or of an unusable type.
    Missing,
}

impl LedgerShape {
    pub fn detect(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(_)) => LedgerShape::Sequence,
            Some(Value::Object(map)) if map.contains_key("parties") => LedgerShape::Wrapped,
            Some(Value::Object(_)) => LedgerShape::Keyed,
            _ => LedgerShape::Missing,
        }
    }
}

// ── ResultNormalizer ──────────────────────────────────────────────────────────

/// Stateless conversion from a raw service response to the canonical payload.
pub struct ResultNormalizer;

impl ResultNormalizer {
    /// Check the minimum contract of a success response: a JSON object with a
    /// `transactions` array.
    pub fn validate(raw: &Value) -> Result<(), DataShapeError> {
        let obj = raw.as_object().ok_or(DataShapeError::NotAnObject)?;
        match obj.get("transactions") {
            Some(Value::Array(_)) => Ok(()),
            _ => Err(DataShapeError::MissingTransactions),
        }
    }

    /// Validate `raw` and build the canonical payload.
    ///
    /// Rows that are not JSON objects are dropped with a warning. Ledgers in
    /// keyed form are ordered by party name (case-insensitive, ties broken by
    /// exact spelling) since the source mapping carries no order of its own.
    pub fn normalize(raw: &Value) -> Result<AnalysisPayload, DataShapeError> {
        Self::validate(raw)?;
        let obj = raw.as_object().ok_or(DataShapeError::NotAnObject)?;

        let transactions = match obj.get("transactions") {
            Some(Value::Array(rows)) => collect_rows::<TransactionRecord>(rows, "transaction"),
            _ => return Err(DataShapeError::MissingTransactions),
        };

        let (party_ledger, party_ledger_summary) = Self::normalize_ledger(obj.get("party_ledger"));

        let account_profile = match obj.get("account_profile") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(other) => other.clone(),
        };

        let fund_flow_chains = Self::normalize_chains(obj.get("fund_flow_chains"));
        let metadata: AnalysisMetadata = parse_or_default(obj.get("metadata"), "metadata");

        debug!(
            transactions = transactions.len(),
            parties = party_ledger.len(),
            chains = fund_flow_chains.chain_count(),
            "analysis payload normalised"
        );

        Ok(AnalysisPayload {
            transactions,
            account_profile,
            party_ledger,
            party_ledger_summary,
            fund_flow_chains,
            metadata,
        })
    }

    /// Convert any accepted ledger shape into ordered rows plus the summary
    /// counters that travelled with a wrapped ledger.
    pub fn normalize_ledger(
        value: Option<&Value>,
    ) -> (Vec<PartyLedgerEntry>, Map<String, Value>) {
        match (LedgerShape::detect(value), value) {
            (LedgerShape::Sequence, Some(Value::Array(rows))) => {
                (collect_rows(rows, "ledger entry"), Map::new())
            }
            (LedgerShape::Wrapped, Some(Value::Object(map))) => {
                let mut summary = map.clone();
                let rows = match summary.remove("parties") {
                    Some(Value::Array(rows)) => collect_rows(&rows, "ledger entry"),
                    _ => {
                        warn!("party_ledger.parties is not an array; ledger left empty");
                        Vec::new()
                    }
                };
                (rows, summary)
            }
            (LedgerShape::Keyed, Some(Value::Object(map))) => (keyed_rows(map), Map::new()),
            (_, Some(Value::Null)) | (_, None) => (Vec::new(), Map::new()),
            (_, Some(other)) => {
                warn!(kind = %json_kind(other), "unusable party_ledger value; ledger left empty");
                (Vec::new(), Map::new())
            }
        }
    }

    /// Build the fund-flow summary. Malformed entries of `top_chains` are
    /// dropped one by one; the counters and the remaining chains are kept.
    pub fn normalize_chains(value: Option<&Value>) -> FundFlowSummary {
        let Some(Value::Object(map)) = value else {
            return parse_or_default(value, "fund_flow_chains");
        };

        let mut fields = map.clone();
        let chains = match fields.remove("top_chains") {
            Some(Value::Array(rows)) => collect_rows::<FundFlowChain>(&rows, "fund flow chain"),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!(kind = %json_kind(&other), "fund_flow_chains.top_chains is not an array; no chains kept");
                Vec::new()
            }
        };

        let mut summary: FundFlowSummary =
            parse_or_default(Some(&Value::Object(fields)), "fund_flow_chains");
        summary.top_chains = chains;
        summary
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn collect_rows<T: DeserializeOwned>(rows: &[Value], what: &str) -> Vec<T> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            if !row.is_object() {
                warn!(index = idx, kind = %json_kind(row), "skipping non-object {}", what);
                return None;
            }
            match serde_json::from_value(row.clone()) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping malformed {}", what);
                    None
                }
            }
        })
        .collect()
}

/// Re-attach each mapping key as `party_name`; the key takes precedence over
/// any `party_name` field inside the value.
fn keyed_rows(map: &Map<String, Value>) -> Vec<PartyLedgerEntry> {
    let mut rows: Vec<PartyLedgerEntry> = map
        .iter()
        .filter_map(|(name, fields)| {
            let mut fields = match fields {
                Value::Object(obj) => obj.clone(),
                other => {
                    warn!(party = %name, kind = %json_kind(other), "skipping non-object ledger entry");
                    return None;
                }
            };
            fields.insert("party_name".to_string(), Value::String(name.clone()));
            match serde_json::from_value::<PartyLedgerEntry>(Value::Object(fields)) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(party = %name, error = %e, "skipping malformed ledger entry");
                    None
                }
            }
        })
        .collect();

    rows.sort_by(|a, b| compare_party_names(&a.party_name, &b.party_name));
    rows
}

fn compare_party_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn parse_or_default<T: DeserializeOwned + Default>(value: Option<&Value>, field: &str) -> T {
    match value {
        None | Some(Value::Null) => T::default(),
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            warn!(field, error = %e, "unusable field replaced with defaults");
            T::default()
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
