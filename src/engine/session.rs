//! Run driver: one query, plan and execute cycle per backend

use std::collections::BTreeSet;

use chrono::Utc;

use crate::backend::{query_or_empty, Backend};
use crate::domain::{reconcile, Policy};
use crate::storage::ListStore;

use super::confirm::Confirm;
use super::executor::{Executor, ExecutorOptions};
use super::report::{BackendReport, BackendStatus, RunReport};

/// Resolved switches for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub policy: Policy,
    pub executor: ExecutorOptions,
}

/// Reconciles a set of backends against the want lists in one directory
pub struct Session<'a> {
    store: ListStore,
    policy: Policy,
    executor: Executor<'a>,
}

impl<'a> Session<'a> {
    pub fn new(store: ListStore, options: RunOptions, confirm: &'a mut dyn Confirm) -> Self {
        Self {
            store,
            policy: options.policy,
            executor: Executor::new(options.executor, confirm),
        }
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    /// Processes every backend in order and collects the report
    pub fn run(&mut self, backends: &[Box<dyn Backend>]) -> RunReport {
        let started_at = Utc::now();
        let reports = backends
            .iter()
            .map(|backend| self.reconcile_one(backend.as_ref()))
            .collect();

        RunReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.executor.options().dry_run,
            backends: reports,
        }
    }

    /// Query, plan and execute one backend
    ///
    /// Nothing here is fatal: a missing list, a missing tool or an
    /// unreadable list skips the backend and the run moves on.
    pub fn reconcile_one(&mut self, backend: &dyn Backend) -> BackendReport {
        let kind = backend.kind();
        let _span = tracing::debug_span!("backend", %kind).entered();

        if !self.store.exists(kind) {
            tracing::debug!(list = %self.store.path_for(kind).display(), "no want list");
            return BackendReport::skipped(kind, BackendStatus::NoWantList, None);
        }

        if !backend.is_available() {
            tracing::warn!(backend = %kind, "backend not available, skipping");
            return BackendReport::skipped(
                kind,
                BackendStatus::Unavailable,
                Some(format!("{}: not available on this machine, skipped", kind)),
            );
        }

        let wanted = match self.store.load(kind) {
            Ok(wanted) => wanted,
            Err(e) => {
                tracing::warn!(backend = %kind, error = %e, "want list unreadable");
                return BackendReport::skipped(
                    kind,
                    BackendStatus::ListUnreadable,
                    Some(format!("{}: {}", kind, e)),
                );
            }
        };

        let mut report = BackendReport::new(kind);

        let (installed, warning) = query_or_empty(backend);
        report.notes.extend(warning);

        let policy = self.policy.effective_for(&kind.capabilities());
        if policy != self.policy {
            report.note(format!(
                "{}: {} not supported, using {}",
                kind, self.policy, policy
            ));
        }
        report.policy = Some(policy);

        let plan = match reconcile(kind, &wanted, &installed, policy) {
            Ok(plan) => plan,
            Err(e) => {
                // effective_for already picked a supported policy
                report.note(e.to_string());
                return report;
            }
        };

        tracing::debug!(
            install = plan.install.len(),
            reinstall = plan.reinstall.len(),
            uninstall = plan.uninstall.len(),
            "planned"
        );

        if self.executor.options().dry_run
            && kind.capabilities().leaf_removal
            && !plan.uninstall.is_empty()
        {
            let targets: BTreeSet<_> = plan.uninstall.iter().cloned().collect();
            report.removal = Some(installed.graph().schedule_removal(&targets));
        }

        self.executor.execute(backend, &plan, &mut report);
        report.plan = Some(plan);
        report
    }
}
