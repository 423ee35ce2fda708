//! Plan execution
//!
//! The executor walks an [`ActionPlan`] batch by batch. Each batch is gated
//! (dry-run, then confirmation unless forced) and, once running, executes
//! item by item. A failing item is recorded and the batch carries on; no
//! single failure stops a batch or a run.

use std::collections::BTreeSet;

use crate::backend::Backend;
use crate::domain::{ActionPlan, Identifier, Policy};

use super::confirm::{Confirm, Prompt};
use super::report::{
    AbortReason, ActionKind, BackendReport, BatchKind, BatchRecord, BatchState, Outcome,
    SkipReason,
};

/// Execution switches, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Report the plan without touching any backend
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub force: bool,
    /// Run the backend cleanup pass after a batch executed
    pub cleanup: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            cleanup: true,
        }
    }
}

/// Executes plans against backends
pub struct Executor<'a> {
    options: ExecutorOptions,
    confirm: &'a mut dyn Confirm,
}

impl<'a> Executor<'a> {
    pub fn new(options: ExecutorOptions, confirm: &'a mut dyn Confirm) -> Self {
        Self { options, confirm }
    }

    pub fn options(&self) -> ExecutorOptions {
        self.options
    }

    /// Executes one backend's plan, recording everything in `report`
    pub fn execute(&mut self, backend: &dyn Backend, plan: &ActionPlan, report: &mut BackendReport) {
        let caps = plan.kind.capabilities();

        if !caps.mutating {
            for id in &plan.install {
                report.record(
                    ActionKind::Install,
                    id.clone(),
                    Outcome::Skipped {
                        reason: SkipReason::ReportOnly,
                    },
                );
            }
            if !plan.install.is_empty() {
                tracing::warn!(
                    backend = %plan.kind,
                    missing = plan.install.len(),
                    "missing items must be installed manually"
                );
            }
            return;
        }

        let mut executed = false;

        if plan.policy == Policy::RecreateExplicit {
            if !plan.is_empty() {
                let items: Vec<Identifier> =
                    plan.uninstall.iter().chain(&plan.install).cloned().collect();
                if self.open_batch(plan, BatchKind::Recreate, &items, report) {
                    if caps.leaf_removal {
                        self.leaf_teardown(backend, plan, report);
                    } else {
                        self.run_items(backend, ActionKind::Uninstall, &plan.uninstall, report);
                    }
                    self.run_items(backend, ActionKind::Install, &plan.install, report);
                    close_batch(report);
                    executed = true;
                }
            }
        } else {
            let installs: Vec<Identifier> =
                plan.install.iter().chain(&plan.reinstall).cloned().collect();
            if !installs.is_empty() && self.open_batch(plan, BatchKind::Install, &installs, report) {
                self.run_items(backend, ActionKind::Install, &plan.install, report);
                self.run_items(backend, ActionKind::Reinstall, &plan.reinstall, report);
                close_batch(report);
                executed = true;
            }

            if !plan.uninstall.is_empty()
                && self.open_batch(plan, BatchKind::Uninstall, &plan.uninstall, report)
            {
                if caps.leaf_removal {
                    self.leaf_teardown(backend, plan, report);
                } else {
                    self.run_items(backend, ActionKind::Uninstall, &plan.uninstall, report);
                }
                close_batch(report);
                executed = true;
            }
        }

        // Runs even after item failures; its own failure is only a warning
        if executed && self.options.cleanup {
            if let Err(e) = backend.cleanup() {
                tracing::warn!(backend = %plan.kind, error = %e, "cleanup failed");
                report.note(format!("{}: cleanup failed: {}", plan.kind, e));
            }
        }
    }

    /// Walks a batch from `Planned` to `Executing`, or to `Aborted`
    ///
    /// Returns true when the batch should run. Aborted batches have their
    /// items recorded as skipped.
    fn open_batch(
        &mut self,
        plan: &ActionPlan,
        kind: BatchKind,
        items: &[Identifier],
        report: &mut BackendReport,
    ) -> bool {
        report.batches.push(BatchRecord {
            kind,
            count: items.len(),
            state: BatchState::Planned,
        });

        let abort = if self.options.dry_run {
            Some(AbortReason::DryRun)
        } else if !self.options.force
            && !self.confirm.confirm(&Prompt {
                kind: plan.kind,
                batch: kind,
                items,
            })
        {
            Some(AbortReason::Declined)
        } else {
            None
        };

        if let Some(reason) = abort {
            set_batch_state(report, BatchState::Aborted(reason));
            let skip = match reason {
                AbortReason::DryRun => SkipReason::DryRun,
                AbortReason::Declined => {
                    tracing::info!(backend = %plan.kind, batch = kind.verb(), "batch declined");
                    SkipReason::Declined
                }
            };
            for (action, ids) in batch_actions(plan, kind) {
                for id in ids {
                    report.record(action, id.clone(), Outcome::Skipped { reason: skip });
                }
            }
            return false;
        }

        set_batch_state(report, BatchState::Confirmed);
        set_batch_state(report, BatchState::Executing);
        true
    }

    fn run_items(
        &mut self,
        backend: &dyn Backend,
        action: ActionKind,
        ids: &[Identifier],
        report: &mut BackendReport,
    ) {
        for id in ids {
            let outcome = run_one(backend, action, id);
            report.record(action, id.clone(), outcome);
        }
    }

    /// Removes packages leaf-first until a round removes nothing
    ///
    /// Leaves are re-queried every round so a package is only removed once
    /// nothing installed depends on it. Packages caught in a cycle, pinned by
    /// the system, or failing to uninstall end the loop instead of spinning.
    fn leaf_teardown(&mut self, backend: &dyn Backend, plan: &ActionPlan, report: &mut BackendReport) {
        let targets: BTreeSet<&Identifier> = plan.uninstall.iter().collect();
        let mut attempted: BTreeSet<Identifier> = BTreeSet::new();
        let mut round = 0usize;

        loop {
            let leaves = match backend.leaves() {
                Ok(leaves) => leaves,
                Err(e) => {
                    tracing::warn!(backend = %plan.kind, error = %e, "could not list leaves");
                    report.note(format!("{}: stopped teardown, could not list leaves: {}", plan.kind, e));
                    break;
                }
            };

            let batch: Vec<Identifier> = leaves
                .into_iter()
                .filter(|id| targets.contains(id) && !attempted.contains(id))
                .collect();
            if batch.is_empty() {
                break;
            }

            round += 1;
            tracing::debug!(backend = %plan.kind, round, count = batch.len(), "removing leaves");

            let mut removed = 0usize;
            for id in batch {
                let outcome = run_one(backend, ActionKind::Uninstall, &id);
                if outcome == Outcome::Succeeded {
                    removed += 1;
                }
                report.record(ActionKind::Uninstall, id.clone(), outcome);
                attempted.insert(id);
            }

            if removed == 0 {
                break;
            }
        }

        for id in plan.uninstall.iter().filter(|id| !attempted.contains(*id)) {
            report.record(
                ActionKind::Uninstall,
                id.clone(),
                Outcome::Skipped {
                    reason: SkipReason::StillRequired,
                },
            );
        }
    }
}

fn run_one(backend: &dyn Backend, action: ActionKind, id: &Identifier) -> Outcome {
    let result = match action {
        ActionKind::Install => backend.install(id),
        ActionKind::Reinstall => backend.reinstall(id),
        ActionKind::Uninstall => backend.uninstall(id),
    };

    match result {
        Ok(()) => Outcome::Succeeded,
        Err(e) => {
            tracing::warn!(
                backend = %backend.kind(),
                action = action.as_str(),
                id = %id,
                error = %e,
                "item failed"
            );
            Outcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Actions covered by a batch, in execution order
fn batch_actions(plan: &ActionPlan, kind: BatchKind) -> Vec<(ActionKind, &[Identifier])> {
    match kind {
        BatchKind::Install => vec![
            (ActionKind::Install, plan.install.as_slice()),
            (ActionKind::Reinstall, plan.reinstall.as_slice()),
        ],
        BatchKind::Uninstall => vec![(ActionKind::Uninstall, plan.uninstall.as_slice())],
        BatchKind::Recreate => vec![
            (ActionKind::Uninstall, plan.uninstall.as_slice()),
            (ActionKind::Install, plan.install.as_slice()),
        ],
    }
}

fn set_batch_state(report: &mut BackendReport, state: BatchState) {
    if let Some(batch) = report.batches.last_mut() {
        batch.state = state;
    }
}

fn close_batch(report: &mut BackendReport) {
    set_batch_state(report, BatchState::Completed);
}
