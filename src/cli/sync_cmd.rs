//! `sync` and `plan` commands

use std::fmt::Write as _;

use anyhow::{Context, Result};

use super::app::SyncArgs;
use super::output::Output;
use crate::backend::{create_backend, Backend};
use crate::domain::Identifier;
use crate::engine::{
    AssumeYes, BackendReport, BackendStatus, Confirm, ExecutorOptions, LinePrompt, Outcome,
    RunOptions, RunReport, Session, Totals,
};
use crate::storage::{Config, ListStore};

/// Runs a reconciliation; `plan_only` forces a dry run
pub fn run(output: &Output, config: &Config, args: &SyncArgs, plan_only: bool) -> Result<()> {
    let list_dir = config
        .resolve_list_dir(args.dir.as_deref())
        .context("Cannot read want lists")?;
    output.verbose_ctx("sync", &format!("Want lists in {}", list_dir.display()));

    let options = RunOptions {
        policy: args.policy(config),
        executor: ExecutorOptions {
            dry_run: plan_only || args.dry_run,
            force: args.force || config.file.force,
            cleanup: config.file.cleanup,
        },
    };
    output.verbose_ctx(
        "sync",
        &format!(
            "policy={} dry_run={} force={}",
            options.policy, options.executor.dry_run, options.executor.force
        ),
    );

    let kinds = config.selected_kinds(&args.types);
    output.verbose_ctx(
        "sync",
        &format!(
            "Backends: {}",
            kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        ),
    );
    let backends: Vec<Box<dyn Backend>> = kinds
        .into_iter()
        .map(|kind| create_backend(kind, config))
        .collect();

    let mut confirm: Box<dyn Confirm> = if options.executor.force || options.executor.dry_run {
        Box::new(AssumeYes)
    } else {
        Box::new(LinePrompt::stdio())
    };

    let report = Session::new(ListStore::new(list_dir), options, confirm.as_mut()).run(&backends);

    if output.is_json() {
        output.data(&ReportView::new(&report));
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

/// JSON shape: the report plus precomputed totals
#[derive(serde::Serialize)]
struct ReportView<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    totals: Totals,
}

impl<'a> ReportView<'a> {
    fn new(report: &'a RunReport) -> Self {
        Self {
            report,
            totals: report.totals(),
        }
    }
}

/// Human-readable report
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    for backend in &report.backends {
        render_backend(&mut out, backend);
    }

    let totals = report.totals();
    let _ = writeln!(
        out,
        "{} planned, {} succeeded, {} failed, {} skipped",
        totals.planned, totals.succeeded, totals.failed, totals.skipped
    );
    if report.dry_run {
        let _ = writeln!(out, "Dry run: nothing was changed.");
    }
    out
}

fn render_backend(out: &mut String, backend: &BackendReport) {
    match backend.status {
        BackendStatus::Reconciled => {}
        BackendStatus::NoWantList => {
            let _ = writeln!(out, "{:<10} skipped (no want list)", backend.kind.as_str());
            return;
        }
        BackendStatus::Unavailable => {
            let _ = writeln!(out, "{:<10} skipped (not available)", backend.kind.as_str());
            return;
        }
        BackendStatus::ListUnreadable => {
            let _ = writeln!(out, "{:<10} skipped (want list unreadable)", backend.kind.as_str());
            for note in &backend.notes {
                let _ = writeln!(out, "  ! {}", note);
            }
            return;
        }
    }

    let policy = backend.policy.map(|p| p.as_str()).unwrap_or("-");
    if backend.results.is_empty() {
        let _ = writeln!(out, "{:<10} up to date ({})", backend.kind.as_str(), policy);
    } else {
        let _ = writeln!(out, "{:<10} {}", backend.kind.as_str(), policy);
        for item in &backend.results {
            let status = match &item.outcome {
                Outcome::Succeeded => "ok".to_string(),
                Outcome::Failed { reason } => format!("FAILED: {}", reason),
                Outcome::Skipped { reason } => format!("skipped ({})", reason),
            };
            let _ = writeln!(
                out,
                "  {:<10} {:<40} {}",
                item.action.as_str(),
                item.id.as_str(),
                status
            );
        }
    }

    if let Some(schedule) = &backend.removal {
        for (round, ids) in schedule.rounds.iter().enumerate() {
            let _ = writeln!(out, "  removal round {}: {}", round + 1, join_ids(ids));
        }
        if !schedule.stuck.is_empty() {
            let _ = writeln!(out, "  ! still required: {}", join_ids(&schedule.stuck));
        }
    }

    for note in &backend.notes {
        let _ = writeln!(out, "  ! {}", note);
    }
}

fn join_ids(ids: &[Identifier]) -> String {
    ids.iter().map(Identifier::as_str).collect::<Vec<_>>().join(", ")
}
