//! Cosmetic upload phase indicator.
//!
//! The analysis service reports no incremental progress. The phases shown
//! here are advanced by a timer while the request is in flight and are a UI
//! approximation only: they say nothing about what the backend is doing.
//! Only a successful response moves the indicator to
//! [`UploadPhase::Complete`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

// ── UploadPhase ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadPhase {
    Upload,
    Extract,
    Merge,
    DetectParties,
    BuildChains,
    Complete,
}

impl UploadPhase {
    pub const ALL: [UploadPhase; 6] = [
        UploadPhase::Upload,
        UploadPhase::Extract,
        UploadPhase::Merge,
        UploadPhase::DetectParties,
        UploadPhase::BuildChains,
        UploadPhase::Complete,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UploadPhase::Upload => "Uploading Files",
            UploadPhase::Extract => "Extracting Transactions",
            UploadPhase::Merge => "Merging Data",
            UploadPhase::DetectParties => "Detecting Parties",
            UploadPhase::BuildChains => "Building Fund Flow Chains",
            UploadPhase::Complete => "Analysis Complete",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Percentage shown while this phase is current.
    pub fn percent(&self) -> u8 {
        match self {
            UploadPhase::Complete => 100,
            other => 10 + 16 * other.index() as u8,
        }
    }

    /// The next phase the timer may move to. The timer never reaches
    /// `Complete`, so `BuildChains` is its last stop.
    fn next_cosmetic(&self) -> Self {
        match self {
            UploadPhase::Upload => UploadPhase::Extract,
            UploadPhase::Extract => UploadPhase::Merge,
            UploadPhase::Merge => UploadPhase::DetectParties,
            UploadPhase::DetectParties | UploadPhase::BuildChains => UploadPhase::BuildChains,
            UploadPhase::Complete => UploadPhase::Complete,
        }
    }
}

// ── UploadProgress ────────────────────────────────────────────────────────────

/// What the indicator currently shows. `phase` is `None` when idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub percent: u8,
    pub phase: Option<UploadPhase>,
}

impl UploadProgress {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn at(phase: UploadPhase) -> Self {
        Self {
            percent: phase.percent(),
            phase: Some(phase),
        }
    }

    /// Whether `phase` is drawn as done.
    pub fn is_completed(&self, phase: UploadPhase) -> bool {
        match self.phase {
            Some(UploadPhase::Complete) => true,
            Some(current) => phase < current,
            None => false,
        }
    }
}

// ── PhaseTicker ───────────────────────────────────────────────────────────────

/// Background task stepping the indicator through the cosmetic phases.
///
/// Dropping the ticker aborts it.
pub struct PhaseTicker {
    handle: JoinHandle<()>,
}

impl PhaseTicker {
    /// Publish `Upload` immediately, then advance one phase per `interval`.
    pub fn start(tx: Arc<watch::Sender<UploadProgress>>, interval: Duration) -> Self {
        tx.send_replace(UploadProgress::at(UploadPhase::Upload));

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut reached_end = false;
                tx.send_modify(|progress| {
                    let current = progress.phase.unwrap_or(UploadPhase::Upload);
                    let next = current.next_cosmetic();
                    reached_end = next == current;
                    *progress = UploadProgress::at(next);
                });
                if reached_end {
                    tracing::debug!("phase ticker reached its last cosmetic phase");
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for PhaseTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
