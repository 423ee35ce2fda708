//! `backends` command

use anyhow::Result;

use super::output::Output;
use crate::backend::{create_backend, program_for};
use crate::domain::{BackendKind, Capabilities};
use crate::storage::Config;

#[derive(serde::Serialize)]
struct BackendRow {
    kind: BackendKind,
    list_file: &'static str,
    program: Option<&'static str>,
    enabled: bool,
    available: bool,
    policies: Vec<&'static str>,
}

fn policies(caps: &Capabilities) -> Vec<&'static str> {
    let mut out = vec!["install_missing"];
    if caps.mutating {
        out.push("prune_extras");
    }
    if caps.recreate {
        out.push("recreate_explicit");
    }
    out
}

/// Lists every backend with its list file and availability
pub fn run(output: &Output, config: &Config) -> Result<()> {
    let enabled = config.selected_kinds(&[]);

    let rows: Vec<BackendRow> = BackendKind::ALL
        .into_iter()
        .map(|kind| {
            let available = create_backend(kind, config).is_available();
            output.verbose_ctx(
                "backends",
                &format!("{}: available={}", kind, available),
            );
            BackendRow {
                kind,
                list_file: kind.list_file(),
                program: program_for(kind),
                enabled: enabled.contains(&kind),
                available,
                policies: policies(&kind.capabilities()),
            }
        })
        .collect();

    if output.is_json() {
        output.data(&rows);
    } else {
        println!(
            "{:<12} {:<16} {:<10} {:<10} POLICIES",
            "BACKEND", "LIST FILE", "PROGRAM", "STATUS"
        );
        println!("{}", "-".repeat(80));
        for row in &rows {
            let status = match (row.enabled, row.available) {
                (false, _) => "disabled",
                (true, true) => "ready",
                (true, false) => "missing",
            };
            println!(
                "{:<12} {:<16} {:<10} {:<10} {}",
                row.kind.as_str(),
                row.list_file,
                row.program.unwrap_or("-"),
                status,
                row.policies.join(", ")
            );
        }
    }

    Ok(())
}
