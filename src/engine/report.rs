//! Execution results and run reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::domain::{ActionPlan, BackendKind, Identifier, Policy, RemovalSchedule};

/// What was attempted for one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Install,
    Reinstall,
    Uninstall,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Install => "install",
            ActionKind::Reinstall => "reinstall",
            ActionKind::Uninstall => "uninstall",
        }
    }
}

/// Why an item was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DryRun,
    Declined,
    ReportOnly,
    /// Never became a leaf during leaf-first teardown
    StillRequired,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::DryRun => "dry run",
            SkipReason::Declined => "declined",
            SkipReason::ReportOnly => "report-only backend",
            SkipReason::StillRequired => "still required by another package",
        })
    }
}

/// Outcome for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { reason: String },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub action: ActionKind,
    pub id: Identifier,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A group of actions confirmed together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    /// Installs and reinstalls
    Install,
    Uninstall,
    /// Full teardown followed by rebuild
    Recreate,
}

impl BatchKind {
    pub fn verb(&self) -> &'static str {
        match self {
            BatchKind::Install => "Install",
            BatchKind::Uninstall => "Uninstall",
            BatchKind::Recreate => "Recreate",
        }
    }
}

/// Why a batch stopped before executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    DryRun,
    Declined,
}

/// Batch lifecycle: `Planned -> Confirmed -> Executing -> Completed`, or
/// `Planned -> Aborted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum BatchState {
    Planned,
    Confirmed,
    Executing,
    Completed,
    Aborted(AbortReason),
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Aborted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    pub kind: BatchKind,
    pub count: usize,
    pub state: BatchState,
}

/// Whether a backend was reconciled at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Reconciled,
    /// No want list for this backend
    NoWantList,
    /// The package manager is not installed
    Unavailable,
    /// The want list could not be read
    ListUnreadable,
}

/// Everything that happened to one backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub kind: BackendKind,
    pub status: BackendStatus,
    pub policy: Option<Policy>,
    pub plan: Option<ActionPlan>,
    /// Leaf-first order the uninstalls would run in, for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<RemovalSchedule>,
    pub batches: Vec<BatchRecord>,
    pub results: Vec<ItemResult>,
    /// Warnings worth showing to the user
    pub notes: Vec<String>,
}

impl BackendReport {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            status: BackendStatus::Reconciled,
            policy: None,
            plan: None,
            removal: None,
            batches: Vec::new(),
            results: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// A backend skipped before planning
    pub fn skipped(kind: BackendKind, status: BackendStatus, note: Option<String>) -> Self {
        let mut report = Self::new(kind);
        report.status = status;
        report.notes.extend(note);
        report
    }

    pub fn record(&mut self, action: ActionKind, id: Identifier, outcome: Outcome) {
        self.results.push(ItemResult { action, id, outcome });
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn skipped_items(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Failed items, for summaries
    pub fn failures(&self) -> impl Iterator<Item = (&ItemResult, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Outcome::Failed { reason } => Some((r, reason.as_str())),
            _ => None,
        })
    }
}

/// Totals across all backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Report for a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub backends: Vec<BackendReport>,
}

impl RunReport {
    pub fn totals(&self) -> Totals {
        self.backends.iter().fold(Totals::default(), |mut t, b| {
            t.planned += b.plan.as_ref().map_or(0, ActionPlan::len);
            t.succeeded += b.succeeded();
            t.failed += b.failed();
            t.skipped += b.skipped_items();
            t
        })
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&BackendReport> {
        self.backends.iter().find(|b| b.kind == kind)
    }
}
