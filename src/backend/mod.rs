//! # Backend Adapters
//!
//! One adapter per package source. Every adapter answers "what is installed"
//! and, unless it is report-only, installs and uninstalls one identifier at a
//! time by shelling out to the package manager's CLI.
//!
//! ## Adapters
//!
//! | Adapter | Backends | Query source |
//! |---------|----------|--------------|
//! | [`CommandBackend`] | tap, cask, mas, npm, yarn, pnpm, pip | listing command |
//! | [`FormulaBackend`] | brew | `brew info --json=v2 --installed` |
//! | [`DirectoryBackend`] | apps, extensions | directory scan (report-only) |
//!
//! Per-backend quirks (commands, output format, uninstall target, cleanup
//! commands) are data in [`CommandSpec`], not control flow.
//!
//! ## Failure Model
//!
//! Adapters return [`BackendError`]; they never print. Callers decide what is
//! fatal. [`query_or_empty`] turns a query failure into an empty installed
//! set plus a warning, which is what a reconciliation run wants.

mod command;
mod directory;
mod formula;
mod parse;
mod runner;

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{BackendKind, Identifier, InstalledState};
use crate::storage::Config;

pub use command::{spec_for, CommandBackend, CommandSpec, UninstallTarget};
pub use directory::DirectoryBackend;
pub use formula::{parse_brew_info, BrewFormula, BrewKeg, FormulaBackend};
pub use parse::ListFormat;
pub use runner::{find_in_path, CommandOutput, Runner, SystemRunner};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{program} is not installed")]
    Unavailable { program: String },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Could not parse output of `{command}`: {message}")]
    Parse { command: String, message: String },

    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} backend does not support {operation}")]
    Unsupported {
        kind: BackendKind,
        operation: &'static str,
    },
}

/// A package source the engine can reconcile
pub trait Backend {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Whether the underlying tool is present on this machine
    fn is_available(&self) -> bool;

    /// Snapshots what is currently installed
    fn query(&self) -> Result<InstalledState, BackendError>;

    /// Installs one identifier
    fn install(&self, id: &Identifier) -> Result<(), BackendError>;

    /// Reinstalls one identifier so it is recorded as explicitly requested
    fn reinstall(&self, id: &Identifier) -> Result<(), BackendError> {
        self.install(id)
    }

    /// Uninstalls one identifier
    fn uninstall(&self, id: &Identifier) -> Result<(), BackendError>;

    /// Current leaves (installed packages nothing else depends on)
    ///
    /// Re-queried on every call.
    fn leaves(&self) -> Result<BTreeSet<Identifier>, BackendError> {
        Ok(self.query()?.prunable().clone())
    }

    /// Backend-wide cleanup after mutations (orphan removal, caches)
    fn cleanup(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Queries a backend, degrading a failure to an empty snapshot
///
/// Returns the warning to surface alongside the (possibly empty) state. An
/// empty snapshot can make every wanted item look missing; that over-install
/// risk is accepted and announced, not hidden.
pub fn query_or_empty(backend: &dyn Backend) -> (InstalledState, Option<String>) {
    match backend.query() {
        Ok(state) => (state, None),
        Err(e) => {
            let warning = format!(
                "{}: could not list installed items, treating as empty: {}",
                backend.kind(),
                e
            );
            tracing::warn!(backend = %backend.kind(), error = %e, "query failed");
            (InstalledState::default(), Some(warning))
        }
    }
}

/// Creates the system adapter for a backend kind
pub fn create_backend(kind: BackendKind, config: &Config) -> Box<dyn Backend> {
    match kind {
        BackendKind::Formula => Box::new(FormulaBackend::new(SystemRunner)),
        BackendKind::Apps => Box::new(DirectoryBackend::new(kind, config.file.apps_dir.clone())),
        BackendKind::Extensions => Box::new(DirectoryBackend::new(
            kind,
            config.extensions_dir().unwrap_or_default(),
        )),
        BackendKind::Tap => Box::new(CommandBackend::new(&command::TAP, SystemRunner)),
        BackendKind::Cask => Box::new(CommandBackend::new(&command::CASK, SystemRunner)),
        BackendKind::AppStore => Box::new(CommandBackend::new(&command::APP_STORE, SystemRunner)),
        BackendKind::Npm => Box::new(CommandBackend::new(&command::NPM, SystemRunner)),
        BackendKind::Yarn => Box::new(CommandBackend::new(&command::YARN, SystemRunner)),
        BackendKind::Pnpm => Box::new(CommandBackend::new(&command::PNPM, SystemRunner)),
        BackendKind::Pip => Box::new(CommandBackend::new(&command::PIP, SystemRunner)),
    }
}

/// Program a backend shells out to, if any
pub fn program_for(kind: BackendKind) -> Option<&'static str> {
    spec_for(kind).map(|spec| spec.program)
}
