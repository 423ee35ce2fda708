//! Homebrew formula adapter
//!
//! Formulae are the one backend where the explicit/dependency distinction
//! matters for every policy. The adapter reads `brew info --json=v2
//! --installed`, which carries both `installed_on_request` and each
//! formula's dependencies, and builds a [`PackageGraph`] from it.
//!
//! If the JSON query fails the adapter falls back to plain `brew list` and
//! `brew leaves`, losing on-request tracking (no reinstall promotion).

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::domain::{BackendKind, Identifier, InstalledState, PackageGraph};

use super::command::{CommandBackend, FORMULA};
use super::runner::{display_command, Runner};
use super::{Backend, BackendError};

const INFO_ARGS: &[&str] = &["info", "--json=v2", "--installed"];

#[derive(Debug, Deserialize)]
struct BrewInfo {
    #[serde(default)]
    formulae: Vec<BrewFormula>,
}

/// One entry of `brew info --json=v2`
#[derive(Debug, Clone, Deserialize)]
pub struct BrewFormula {
    pub full_name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub installed: Vec<BrewKeg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrewKeg {
    #[serde(default)]
    pub installed_on_request: bool,
}

impl BrewFormula {
    pub fn installed_on_request(&self) -> bool {
        self.installed.iter().any(|keg| keg.installed_on_request)
    }
}

/// Parses `brew info --json=v2 --installed` output
pub fn parse_brew_info(json: &str) -> Result<Vec<BrewFormula>, String> {
    let info: BrewInfo = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(info.formulae)
}

/// Formula adapter with dependency tracking
pub struct FormulaBackend<R: Runner> {
    inner: CommandBackend<R>,
}

impl<R: Runner> FormulaBackend<R> {
    pub fn new(runner: R) -> Self {
        Self {
            inner: CommandBackend::new(&FORMULA, runner),
        }
    }

    pub fn runner(&self) -> &R {
        self.inner.runner()
    }

    /// Installed state and dependency graph from the JSON query
    pub fn snapshot(&self) -> Result<(InstalledState, PackageGraph), BackendError> {
        let stdout = self.inner.run_checked(INFO_ARGS)?;
        let formulae = parse_brew_info(&stdout).map_err(|message| BackendError::Parse {
            command: display_command("brew", INFO_ARGS),
            message,
        })?;

        let mut explicit = BTreeSet::new();
        let mut entries = Vec::with_capacity(formulae.len());
        for formula in &formulae {
            let Ok(id) = Identifier::new(formula.full_name.as_str()) else {
                continue;
            };
            if formula.installed_on_request() {
                explicit.insert(id.clone());
            }
            let deps: Vec<Identifier> = formula
                .dependencies
                .iter()
                .filter_map(|d| Identifier::new(d.as_str()).ok())
                .collect();
            entries.push((id, deps));
        }

        let graph = PackageGraph::from_dependencies(entries);
        let state = InstalledState {
            all: graph.packages(),
            explicit: Some(explicit),
            top_level: Some(graph.leaves()),
            ..InstalledState::default()
        }
        .with_graph(&graph);
        Ok((state, graph))
    }

    fn flat_query(&self) -> Result<InstalledState, BackendError> {
        let all = self.inner.list_with(FORMULA.list)?;
        let top_level = self.brew_leaves().ok();
        Ok(InstalledState {
            all,
            explicit: None,
            top_level,
            ..InstalledState::default()
        })
    }

    fn brew_leaves(&self) -> Result<BTreeSet<Identifier>, BackendError> {
        match FORMULA.top_level {
            Some(args) => self.inner.list_with(args),
            None => self.inner.list_with(FORMULA.list),
        }
    }
}

impl<R: Runner> Backend for FormulaBackend<R> {
    fn kind(&self) -> BackendKind {
        BackendKind::Formula
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn query(&self) -> Result<InstalledState, BackendError> {
        match self.snapshot() {
            Ok((state, _)) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "brew JSON query failed; on-request tracking unavailable"
                );
                self.flat_query()
            }
        }
    }

    fn install(&self, id: &Identifier) -> Result<(), BackendError> {
        self.inner.install(id)
    }

    fn reinstall(&self, id: &Identifier) -> Result<(), BackendError> {
        self.inner.reinstall(id)
    }

    fn uninstall(&self, id: &Identifier) -> Result<(), BackendError> {
        self.inner.uninstall(id)
    }

    fn leaves(&self) -> Result<BTreeSet<Identifier>, BackendError> {
        match self.snapshot() {
            Ok((_, graph)) => Ok(graph.leaves()),
            Err(e) => {
                tracing::warn!(error = %e, "brew JSON query failed; falling back to brew leaves");
                self.brew_leaves()
            }
        }
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        self.inner.cleanup()
    }
}
