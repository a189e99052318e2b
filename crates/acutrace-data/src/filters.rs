//! Compound, order-preserving transaction filter.
//!
//! Every dimension of [`FilterCriteria`] is independent and the active ones
//! are combined with logical AND, so adding a predicate can only shrink the
//! result and re-applying the same criteria is a no-op.

use std::fmt;
use std::str::FromStr;

use acutrace_core::models::TransactionRecord;
use acutrace_core::time_utils::TimezoneHandler;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

// ── TransactionKind ───────────────────────────────────────────────────────────

/// Transaction-type dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionKind {
    #[default]
    All,
    /// `credit > 0`.
    Credit,
    /// `debit > 0`.
    Debit,
    /// Category contains `"transfer"` (case-insensitive).
    Transfer,
    /// Category contains `"upi"` (case-insensitive).
    Upi,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::All => "all",
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Upi => "upi",
        }
    }

    fn matches(&self, txn: &TransactionRecord) -> bool {
        match self {
            TransactionKind::All => true,
            TransactionKind::Credit => txn.credit > 0.0,
            TransactionKind::Debit => txn.debit > 0.0,
            TransactionKind::Transfer => contains_ci(&txn.category, "transfer"),
            TransactionKind::Upi => contains_ci(&txn.category, "upi"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TransactionKind::All),
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            "transfer" => Ok(TransactionKind::Transfer),
            "upi" => Ok(TransactionKind::Upi),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DateBucket ────────────────────────────────────────────────────────────────

/// Date dimension, evaluated against the wall clock at filter time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateBucket {
    #[default]
    All,
    /// Same calendar day as now.
    Today,
    /// On or after exactly seven days before now (a rolling window).
    ThisWeek,
    /// Same calendar month and year as now.
    ThisMonth,
    /// From the first of the previous month up to, not including, the first
    /// of the current month.
    LastMonth,
}

impl DateBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateBucket::All => "all",
            DateBucket::Today => "today",
            DateBucket::ThisWeek => "thisWeek",
            DateBucket::ThisMonth => "thisMonth",
            DateBucket::LastMonth => "lastMonth",
        }
    }

    /// Whether `date` falls inside the bucket relative to `now`. Both are
    /// local wall-clock readings in the same zone.
    pub fn contains(&self, date: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            DateBucket::All => true,
            DateBucket::Today => date.date() == now.date(),
            DateBucket::ThisWeek => date >= now - Duration::days(7),
            DateBucket::ThisMonth => date.year() == now.year() && date.month() == now.month(),
            DateBucket::LastMonth => {
                let this_month = first_of_month(now.year(), now.month());
                let last_month = if now.month() == 1 {
                    first_of_month(now.year() - 1, 12)
                } else {
                    first_of_month(now.year(), now.month() - 1)
                };
                match (last_month, this_month) {
                    (Some(start), Some(end)) => date >= start && date < end,
                    _ => true,
                }
            }
        }
    }
}

impl FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DateBucket::All),
            "today" => Ok(DateBucket::Today),
            "thisWeek" => Ok(DateBucket::ThisWeek),
            "thisMonth" => Ok(DateBucket::ThisMonth),
            "lastMonth" => Ok(DateBucket::LastMonth),
            other => Err(format!("unknown date filter: {other}")),
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── FilterCriteria ────────────────────────────────────────────────────────────

/// The predicate set. `Default` is the "clear all filters" state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub kind: TransactionKind,
    /// Case-insensitive substring of the party; empty disables it.
    pub party: String,
    /// Case-insensitive substring of the description; empty disables it.
    pub search: String,
    pub date: DateBucket,
}

impl FilterCriteria {
    /// Narrow to one party, keeping the other dimensions as they are.
    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = party.into();
        self
    }

    /// `true` when no dimension is active.
    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Non-date dimensions.
    fn matches_fields(&self, txn: &TransactionRecord) -> bool {
        if !self.kind.matches(txn) {
            return false;
        }
        if !self.party.is_empty() && !contains_ci(&txn.party, &self.party) {
            return false;
        }
        if !self.search.is_empty() && !contains_ci(&txn.description, &self.search) {
            return false;
        }
        true
    }
}

// ── FilterEngine ──────────────────────────────────────────────────────────────

/// Applies [`FilterCriteria`] with dates read in one timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine {
    tz: TimezoneHandler,
}

impl FilterEngine {
    pub fn new(tz: TimezoneHandler) -> Self {
        Self { tz }
    }

    /// Filter against the current wall clock.
    pub fn apply(
        &self,
        transactions: &[TransactionRecord],
        criteria: &FilterCriteria,
    ) -> Vec<TransactionRecord> {
        self.apply_at(transactions, criteria, Utc::now())
    }

    /// Filter with an explicit notion of "now".
    ///
    /// Output preserves input order. A transaction whose date cannot be
    /// parsed passes the date dimension.
    pub fn apply_at(
        &self,
        transactions: &[TransactionRecord],
        criteria: &FilterCriteria,
        now: DateTime<Utc>,
    ) -> Vec<TransactionRecord> {
        let local_now = self.tz.to_local(now);

        let filtered: Vec<TransactionRecord> = transactions
            .iter()
            .filter(|txn| criteria.matches_fields(txn))
            .filter(|txn| self.matches_date(txn, criteria.date, local_now))
            .cloned()
            .collect();

        debug!(
            input = transactions.len(),
            output = filtered.len(),
            kind = %criteria.kind,
            date = %criteria.date,
            "transactions filtered"
        );
        filtered
    }

    fn matches_date(&self, txn: &TransactionRecord, bucket: DateBucket, now: NaiveDateTime) -> bool {
        if bucket == DateBucket::All {
            return true;
        }
        match self.tz.parse_loose_date(&txn.date) {
            Some(date) => bucket.contains(date, now),
            None => true,
        }
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn txn(date: &str, party: &str, desc: &str, credit: f64, debit: f64, cat: &str) -> TransactionRecord {
        TransactionRecord {
            date: date.to_string(),
            party: party.to_string(),
            description: desc.to_string(),
            credit,
            debit,
            category: cat.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            txn("2024-03-14", "ACME Traders", "NEFT salary March", 50_000.0, 0.0, "NEFT Transfer"),
            txn("2024-03-10", "Ravi Kumar", "UPI/ravi@okaxis/rent", 0.0, 12_000.0, "UPI"),
            txn("2024-02-20", "ravi kumar", "UPI/refund", 500.0, 0.0, "UPI Credit"),
            txn("2024-02-01", "City Power", "Electricity bill", 0.0, 1_800.0, "Bill Payment"),
            txn("garbage", "Unknown", "Cash deposit", 2_000.0, 0.0, ""),
            txn("2024-01-31", "ACME Traders", "NEFT salary January", 50_000.0, 0.0, "Transfer"),
        ]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn parties(rows: &[TransactionRecord]) -> Vec<&str> {
        rows.iter().map(|t| t.party.as_str()).collect()
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(TimezoneHandler::new("UTC"))
    }

    // ── single dimensions ─────────────────────────────────────────────────

    #[test]
    fn test_empty_criteria_returns_everything_in_order() {
        let rows = sample();
        let out = engine().apply_at(&rows, &FilterCriteria::default(), now());
        assert_eq!(out, rows);
    }

    #[test]
    fn test_kind_credit_and_debit() {
        let rows = sample();
        let credit = FilterCriteria {
            kind: TransactionKind::Credit,
            ..Default::default()
        };
        assert_eq!(engine().apply_at(&rows, &credit, now()).len(), 4);

        let debit = FilterCriteria {
            kind: TransactionKind::Debit,
            ..Default::default()
        };
        assert_eq!(
            parties(&engine().apply_at(&rows, &debit, now())),
            vec!["Ravi Kumar", "City Power"]
        );
    }

    #[test]
    fn test_kind_transfer_and_upi_match_category_substring() {
        let rows = sample();
        let transfer = FilterCriteria {
            kind: TransactionKind::Transfer,
            ..Default::default()
        };
        assert_eq!(
            parties(&engine().apply_at(&rows, &transfer, now())),
            vec!["ACME Traders", "ACME Traders"]
        );

        let upi = FilterCriteria {
            kind: TransactionKind::Upi,
            ..Default::default()
        };
        assert_eq!(engine().apply_at(&rows, &upi, now()).len(), 2);
    }

    #[test]
    fn test_party_is_case_insensitive_substring() {
        let rows = sample();
        let criteria = FilterCriteria::default().with_party("RAVI");
        assert_eq!(
            parties(&engine().apply_at(&rows, &criteria, now())),
            vec!["Ravi Kumar", "ravi kumar"]
        );
    }

    #[test]
    fn test_search_matches_description() {
        let rows = sample();
        let criteria = FilterCriteria {
            search: "salary".to_string(),
            ..Default::default()
        };
        assert_eq!(engine().apply_at(&rows, &criteria, now()).len(), 2);
    }

    // ── date buckets ──────────────────────────────────────────────────────

    #[test]
    fn test_unparseable_date_passes_date_filter() {
        let rows = sample();
        for bucket in [
            DateBucket::Today,
            DateBucket::ThisWeek,
            DateBucket::ThisMonth,
            DateBucket::LastMonth,
        ] {
            let criteria = FilterCriteria {
                date: bucket,
                ..Default::default()
            };
            let out = engine().apply_at(&rows, &criteria, now());
            assert!(
                out.iter().any(|t| t.date == "garbage"),
                "bucket {bucket} dropped the unparseable row"
            );
        }
    }

    #[test]
    fn test_this_month() {
        let rows = sample();
        let criteria = FilterCriteria {
            date: DateBucket::ThisMonth,
            ..Default::default()
        };
        let dates: Vec<String> = engine()
            .apply_at(&rows, &criteria, now())
            .into_iter()
            .map(|t| t.date)
            .collect();
        assert_eq!(dates, vec!["2024-03-14", "2024-03-10", "garbage"]);
    }

    #[test]
    fn test_last_month_excludes_boundaries() {
        let rows = sample();
        let criteria = FilterCriteria {
            date: DateBucket::LastMonth,
            ..Default::default()
        };
        let dates: Vec<String> = engine()
            .apply_at(&rows, &criteria, now())
            .into_iter()
            .map(|t| t.date)
            .collect();
        assert_eq!(dates, vec!["2024-02-20", "2024-02-01", "garbage"]);
    }

    #[test]
    fn test_last_month_wraps_year() {
        let january = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let rows = vec![
            txn("2023-12-05", "A", "", 1.0, 0.0, ""),
            txn("2023-11-30", "B", "", 1.0, 0.0, ""),
        ];
        let criteria = FilterCriteria {
            date: DateBucket::LastMonth,
            ..Default::default()
        };
        assert_eq!(parties(&engine().apply_at(&rows, &criteria, january)), vec!["A"]);
    }

    #[test]
    fn test_this_week_is_rolling_seven_days() {
        let rows = vec![
            txn("2024-03-08 12:00:00", "edge", "", 1.0, 0.0, ""),
            txn("2024-03-08 11:59:59", "outside", "", 1.0, 0.0, ""),
            txn("2024-03-14", "inside", "", 1.0, 0.0, ""),
        ];
        let criteria = FilterCriteria {
            date: DateBucket::ThisWeek,
            ..Default::default()
        };
        assert_eq!(
            parties(&engine().apply_at(&rows, &criteria, now())),
            vec!["edge", "inside"]
        );
    }

    #[test]
    fn test_today_uses_configured_timezone() {
        // 2024-03-15 20:00 UTC is already 2024-03-16 in Kolkata.
        let late = Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap();
        let rows = vec![
            txn("2024-03-15", "utc-day", "", 1.0, 0.0, ""),
            txn("2024-03-16", "ist-day", "", 1.0, 0.0, ""),
        ];
        let criteria = FilterCriteria {
            date: DateBucket::Today,
            ..Default::default()
        };
        let ist = FilterEngine::new(TimezoneHandler::new("Asia/Kolkata"));
        assert_eq!(parties(&ist.apply_at(&rows, &criteria, late)), vec!["ist-day"]);
        assert_eq!(parties(&engine().apply_at(&rows, &criteria, late)), vec!["utc-day"]);
    }

    // ── algebraic properties ──────────────────────────────────────────────

    fn criteria_grid() -> Vec<FilterCriteria> {
        let mut grid = Vec::new();
        for kind in [
            TransactionKind::All,
            TransactionKind::Credit,
            TransactionKind::Debit,
            TransactionKind::Transfer,
            TransactionKind::Upi,
        ] {
            for date in [DateBucket::All, DateBucket::ThisMonth, DateBucket::LastMonth] {
                for party in ["", "acme", "ravi"] {
                    grid.push(FilterCriteria {
                        kind,
                        party: party.to_string(),
                        search: String::new(),
                        date,
                    });
                }
            }
        }
        grid
    }

    #[test]
    fn test_filter_is_idempotent() {
        let rows = sample();
        for criteria in criteria_grid() {
            let once = engine().apply_at(&rows, &criteria, now());
            let twice = engine().apply_at(&once, &criteria, now());
            assert_eq!(once, twice, "not idempotent for {criteria:?}");
        }
    }

    /// Every criteria that constrains exactly one dimension `base` leaves open.
    fn narrowings(base: &FilterCriteria) -> Vec<FilterCriteria> {
        let mut out = Vec::new();
        if base.kind == TransactionKind::All {
            for kind in [
                TransactionKind::Credit,
                TransactionKind::Debit,
                TransactionKind::Transfer,
                TransactionKind::Upi,
            ] {
                out.push(FilterCriteria { kind, ..base.clone() });
            }
        }
        if base.party.is_empty() {
            for party in ["acme", "ravi", "nobody"] {
                out.push(base.clone().with_party(party));
            }
        }
        if base.date == DateBucket::All {
            for date in [
                DateBucket::Today,
                DateBucket::ThisWeek,
                DateBucket::ThisMonth,
                DateBucket::LastMonth,
            ] {
                out.push(FilterCriteria { date, ..base.clone() });
            }
        }
        if base.search.is_empty() {
            for search in ["upi", "salary", "zzz"] {
                out.push(FilterCriteria {
                    search: search.to_string(),
                    ..base.clone()
                });
            }
        }
        out
    }

    #[test]
    fn test_adding_predicate_never_grows_result() {
        let rows = sample();
        let mut checked = 0;
        for base in criteria_grid() {
            let base_out = engine().apply_at(&rows, &base, now());
            for narrowed in narrowings(&base) {
                let narrowed_out = engine().apply_at(&rows, &narrowed, now());
                assert!(
                    narrowed_out.len() <= base_out.len(),
                    "{narrowed:?} grew the result of {base:?}"
                );
                assert!(
                    narrowed_out.iter().all(|t| base_out.contains(t)),
                    "{narrowed:?} kept a row {base:?} dropped"
                );
                checked += 1;
            }
        }
        // Every dimension is narrowed from the unconstrained base.
        assert_eq!(narrowings(&FilterCriteria::default()).len(), 14);
        assert!(checked > 14);
    }

    // ── parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_kind_and_bucket_from_str() {
        assert_eq!("UPI".parse::<TransactionKind>(), Ok(TransactionKind::Upi));
        assert!("cash".parse::<TransactionKind>().is_err());
        assert_eq!("lastMonth".parse::<DateBucket>(), Ok(DateBucket::LastMonth));
        assert!("yesterday".parse::<DateBucket>().is_err());
    }

    #[test]
    fn test_criteria_is_empty() {
        assert!(FilterCriteria::default().is_empty());
        assert!(!FilterCriteria::default().with_party("x").is_empty());
    }
}
