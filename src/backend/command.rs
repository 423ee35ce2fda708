//! Command-driven adapters
//!
//! Most backends follow the same pattern: one command lists what is
//! installed, one installs an identifier, one removes it. [`CommandSpec`]
//! captures the commands and quirks of each; [`CommandBackend`] runs them.

use std::collections::BTreeSet;

use crate::domain::{BackendKind, Identifier, InstalledState};

use super::parse::ListFormat;
use super::runner::{display_command, Runner};
use super::{Backend, BackendError};

/// What gets passed to the uninstall command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallTarget {
    /// The identifier as-is
    Full,
    /// The last `/` segment (`user/tap/name` -> `name`)
    TrailingSegment,
}

/// Commands and quirks for one backend
#[derive(Debug)]
pub struct CommandSpec {
    pub kind: BackendKind,
    pub program: &'static str,
    /// Arguments listing everything installed
    pub list: &'static [&'static str],
    pub list_format: ListFormat,
    /// Arguments listing only top-level installs (not required by others)
    pub top_level: Option<&'static [&'static str]>,
    pub install: &'static [&'static str],
    pub reinstall: Option<&'static [&'static str]>,
    pub uninstall: &'static [&'static str],
    pub uninstall_target: UninstallTarget,
    /// Commands run after a mutating batch, in order
    pub cleanup: &'static [&'static [&'static str]],
}

pub static TAP: CommandSpec = CommandSpec {
    kind: BackendKind::Tap,
    program: "brew",
    list: &["tap"],
    list_format: ListFormat::Lines,
    top_level: None,
    install: &["tap"],
    reinstall: None,
    uninstall: &["untap"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

/// Formula commands; [`super::FormulaBackend`] layers the JSON query on top
pub static FORMULA: CommandSpec = CommandSpec {
    kind: BackendKind::Formula,
    program: "brew",
    list: &["list", "--formula", "--full-name"],
    list_format: ListFormat::Lines,
    top_level: Some(&["leaves"]),
    install: &["install"],
    reinstall: Some(&["reinstall"]),
    uninstall: &["uninstall"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[&["autoremove"], &["cleanup"]],
};

pub static CASK: CommandSpec = CommandSpec {
    kind: BackendKind::Cask,
    program: "brew",
    list: &["list", "--cask", "--full-name"],
    list_format: ListFormat::Lines,
    top_level: None,
    install: &["install", "--cask"],
    reinstall: None,
    uninstall: &["uninstall", "--cask"],
    uninstall_target: UninstallTarget::TrailingSegment,
    cleanup: &[&["cleanup"]],
};

pub static APP_STORE: CommandSpec = CommandSpec {
    kind: BackendKind::AppStore,
    program: "mas",
    list: &["list"],
    list_format: ListFormat::FirstColumn,
    top_level: None,
    install: &["install"],
    reinstall: None,
    uninstall: &["uninstall"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

pub static NPM: CommandSpec = CommandSpec {
    kind: BackendKind::Npm,
    program: "npm",
    list: &["ls", "-g", "--depth=0", "--json"],
    list_format: ListFormat::NpmJson,
    top_level: None,
    install: &["install", "-g"],
    reinstall: None,
    uninstall: &["uninstall", "-g"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

pub static YARN: CommandSpec = CommandSpec {
    kind: BackendKind::Yarn,
    program: "yarn",
    list: &["global", "list"],
    list_format: ListFormat::YarnGlobal,
    top_level: None,
    install: &["global", "add"],
    reinstall: None,
    uninstall: &["global", "remove"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

pub static PNPM: CommandSpec = CommandSpec {
    kind: BackendKind::Pnpm,
    program: "pnpm",
    list: &["ls", "-g", "--depth=0", "--json"],
    list_format: ListFormat::PnpmJson,
    top_level: None,
    install: &["add", "-g"],
    reinstall: None,
    uninstall: &["remove", "-g"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

pub static PIP: CommandSpec = CommandSpec {
    kind: BackendKind::Pip,
    program: "python3",
    list: &["-m", "pip", "list", "--user", "--format=json"],
    list_format: ListFormat::PipJson,
    top_level: Some(&["-m", "pip", "list", "--user", "--not-required", "--format=json"]),
    install: &["-m", "pip", "install", "--user"],
    reinstall: None,
    uninstall: &["-m", "pip", "uninstall", "-y"],
    uninstall_target: UninstallTarget::Full,
    cleanup: &[],
};

/// Looks up the command spec for a backend
pub fn spec_for(kind: BackendKind) -> Option<&'static CommandSpec> {
    match kind {
        BackendKind::Tap => Some(&TAP),
        BackendKind::Formula => Some(&FORMULA),
        BackendKind::Cask => Some(&CASK),
        BackendKind::AppStore => Some(&APP_STORE),
        BackendKind::Npm => Some(&NPM),
        BackendKind::Yarn => Some(&YARN),
        BackendKind::Pnpm => Some(&PNPM),
        BackendKind::Pip => Some(&PIP),
        BackendKind::Apps | BackendKind::Extensions => None,
    }
}

/// Adapter driven entirely by a [`CommandSpec`]
pub struct CommandBackend<R: Runner> {
    spec: &'static CommandSpec,
    runner: R,
}

impl<R: Runner> CommandBackend<R> {
    pub fn new(spec: &'static CommandSpec, runner: R) -> Self {
        Self { spec, runner }
    }

    pub fn spec(&self) -> &'static CommandSpec {
        self.spec
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs `program args...` and fails on a non-zero exit
    pub fn run_checked(&self, args: &[&str]) -> Result<String, BackendError> {
        let command = display_command(self.spec.program, args);
        let output = self.runner.run(self.spec.program, args)?.check(&command)?;
        Ok(output.stdout)
    }

    /// Runs a listing command and normalizes the names it prints
    pub fn list_with(&self, args: &[&str]) -> Result<BTreeSet<Identifier>, BackendError> {
        let stdout = self.run_checked(args)?;
        let names = self
            .spec
            .list_format
            .parse(&stdout)
            .map_err(|message| BackendError::Parse {
                command: display_command(self.spec.program, args),
                message,
            })?;

        Ok(names
            .iter()
            .filter_map(|name| self.spec.kind.normalize_installed(name))
            .collect())
    }

    /// Runs a per-identifier command (`install`, `uninstall`, ...)
    fn run_with_id(&self, base: &[&str], id: &str) -> Result<(), BackendError> {
        let mut args: Vec<&str> = base.to_vec();
        args.push(id);
        self.run_checked(&args).map(|_| ())
    }
}

impl<R: Runner> Backend for CommandBackend<R> {
    fn kind(&self) -> BackendKind {
        self.spec.kind
    }

    fn is_available(&self) -> bool {
        self.runner.find_program(self.spec.program).is_some()
    }

    fn query(&self) -> Result<InstalledState, BackendError> {
        let all = self.list_with(self.spec.list)?;

        let top_level = match self.spec.top_level {
            Some(args) => match self.list_with(args) {
                Ok(set) => Some(set),
                Err(e) => {
                    tracing::warn!(
                        backend = %self.spec.kind,
                        error = %e,
                        "top-level listing failed; treating every install as explicit"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(InstalledState {
            all,
            explicit: top_level.clone(),
            top_level,
            ..InstalledState::default()
        })
    }

    fn install(&self, id: &Identifier) -> Result<(), BackendError> {
        self.run_with_id(self.spec.install, id.as_str())
    }

    fn reinstall(&self, id: &Identifier) -> Result<(), BackendError> {
        match self.spec.reinstall {
            Some(args) => self.run_with_id(args, id.as_str()),
            None => self.install(id),
        }
    }

    fn uninstall(&self, id: &Identifier) -> Result<(), BackendError> {
        let target = match self.spec.uninstall_target {
            UninstallTarget::Full => id.as_str(),
            UninstallTarget::TrailingSegment => id.trailing_segment(),
        };
        self.run_with_id(self.spec.uninstall, target)
    }

    fn leaves(&self) -> Result<BTreeSet<Identifier>, BackendError> {
        match self.spec.top_level {
            Some(args) => self.list_with(args),
            None => self.list_with(self.spec.list),
        }
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        for args in self.spec.cleanup {
            self.run_checked(args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::runner::fake::FakeRunner;
    use super::super::runner::CommandOutput;
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<Identifier> {
        items.iter().map(|s| id(s)).collect()
    }

    #[test]
    fn every_command_kind_has_matching_spec() {
        for kind in BackendKind::ALL {
            if let Some(spec) = spec_for(kind) {
                assert_eq!(spec.kind, kind);
            }
        }
        assert!(spec_for(BackendKind::Apps).is_none());
    }

    #[test]
    fn npm_query_normalizes() {
        let runner = FakeRunner::new().respond(
            "npm ls -g --depth=0 --json",
            CommandOutput::ok(r#"{"dependencies": {"npm": {}, "@babel/core": {}}}"#),
        );
        let backend = CommandBackend::new(&NPM, runner);

        let state = backend.query().unwrap();
        assert_eq!(state.all, set(&["@babel/core", "npm"]));
        assert!(!state.supports_explicit_tracking());
    }

    #[test]
    fn yarn_query_strips_versions() {
        let runner = FakeRunner::new().respond(
            "yarn global list",
            CommandOutput::ok("info \"@vue/cli@5.0.8\" has binaries:\n   - vue\n"),
        );
        let state = CommandBackend::new(&YARN, runner).query().unwrap();
        assert_eq!(state.all, set(&["@vue/cli"]));
    }

    #[test]
    fn pip_query_uses_not_required_as_top_level() {
        let runner = FakeRunner::new()
            .respond(
                "python3 -m pip list --user --format=json",
                CommandOutput::ok(r#"[{"name":"black","version":"24"},{"name":"click","version":"8"}]"#),
            )
            .respond(
                "python3 -m pip list --user --not-required --format=json",
                CommandOutput::ok(r#"[{"name":"black","version":"24"}]"#),
            );
        let state = CommandBackend::new(&PIP, runner).query().unwrap();

        assert_eq!(state.all.len(), 2);
        assert_eq!(state.prunable(), &set(&["black"]));
    }

    #[test]
    fn pip_top_level_failure_degrades() {
        let runner = FakeRunner::new()
            .respond(
                "python3 -m pip list --user --format=json",
                CommandOutput::ok(r#"[{"name":"black","version":"24"}]"#),
            )
            .respond(
                "python3 -m pip list --user --not-required --format=json",
                CommandOutput::failed("2", "no such option: --not-required"),
            );
        let state = CommandBackend::new(&PIP, runner).query().unwrap();
        assert!(state.top_level.is_none());
        assert_eq!(state.prunable(), &state.all);
    }

    #[test]
    fn query_failure_propagates() {
        let runner = FakeRunner::new().respond("mas list", CommandOutput::failed("1", "not signed in"));
        let err = CommandBackend::new(&APP_STORE, runner).query().unwrap_err();
        assert!(err.to_string().contains("not signed in"));
    }

    #[test]
    fn malformed_listing_is_parse_error() {
        let runner = FakeRunner::new().respond("pnpm ls -g --depth=0 --json", CommandOutput::ok("oops"));
        let err = CommandBackend::new(&PNPM, runner).query().unwrap_err();
        assert!(matches!(err, BackendError::Parse { .. }));
    }

    #[test]
    fn cask_uninstall_uses_trailing_segment() {
        let backend = CommandBackend::new(&CASK, FakeRunner::new());
        backend.install(&id("homebrew/cask-fonts/font-fira-code")).unwrap();
        backend.uninstall(&id("homebrew/cask-fonts/font-fira-code")).unwrap();

        assert_eq!(
            backend.runner().calls(),
            vec![
                "brew install --cask homebrew/cask-fonts/font-fira-code",
                "brew uninstall --cask font-fira-code",
            ]
        );
    }

    #[test]
    fn app_store_uninstall_uses_raw_id() {
        let backend = CommandBackend::new(&APP_STORE, FakeRunner::new());
        backend.uninstall(&id("497799835")).unwrap();
        assert_eq!(backend.runner().calls(), vec!["mas uninstall 497799835"]);
    }

    #[test]
    fn install_failure_is_error() {
        let runner = FakeRunner::new().respond(
            "npm install -g nope",
            CommandOutput::failed("1", "npm ERR! 404 Not Found - nope"),
        );
        let err = CommandBackend::new(&NPM, runner).install(&id("nope")).unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn reinstall_falls_back_to_install() {
        let backend = CommandBackend::new(&CASK, FakeRunner::new());
        backend.reinstall(&id("zed")).unwrap();
        assert_eq!(backend.runner().calls(), vec!["brew install --cask zed"]);
    }

    #[test]
    fn cleanup_runs_in_order() {
        let backend = CommandBackend::new(&FORMULA, FakeRunner::new());
        backend.cleanup().unwrap();
        assert_eq!(backend.runner().calls(), vec!["brew autoremove", "brew cleanup"]);
    }

    #[test]
    fn availability_follows_path_lookup() {
        assert!(CommandBackend::new(&NPM, FakeRunner::new()).is_available());
        assert!(!CommandBackend::new(&NPM, FakeRunner::new().without_programs()).is_available());
    }
}
