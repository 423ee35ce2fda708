//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{backends_cmd, sync_cmd};
use crate::domain::{BackendKind, Policy};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "pkgsync")]
#[command(author, version, about = "Reconcile installed packages against plain-text want lists")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file (defaults to <config dir>/pkgsync/config.toml)
    #[arg(long, global = true, env = "PKGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring installed packages in line with the want lists
    Sync(SyncArgs),

    /// Show what sync would do without changing anything
    Plan(SyncArgs),

    /// List supported backends and whether they are available
    Backends,
}

/// Options shared by `sync` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Report the plan without installing or removing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Also remove explicit installs missing from the want lists
    #[arg(long, conflicts_with = "recreate")]
    pub prune: bool,

    /// Tear down and rebuild each backend's explicit set
    #[arg(long)]
    pub recreate: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y', alias = "yes")]
    pub force: bool,

    /// Only these backends (comma-separated)
    #[arg(long, short = 't', value_delimiter = ',')]
    pub types: Vec<BackendKind>,

    /// Directory holding the want lists
    #[arg(long, env = "PKGSYNC_DIR")]
    pub dir: Option<PathBuf>,
}

impl SyncArgs {
    /// Policy from flags, falling back to the configured default
    pub fn policy(&self, config: &Config) -> Policy {
        if self.recreate {
            Policy::RecreateExplicit
        } else if self.prune {
            Policy::PruneExtras
        } else {
            config.file.policy
        }
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("pkgsync starting");

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    match &config.source {
        Some(path) => output.verbose_ctx("config", &format!("Loaded {}", path.display())),
        None => output.verbose_ctx("config", "No config file, using defaults"),
    }

    match cli.command {
        Commands::Sync(args) => sync_cmd::run(&output, &config, &args, false)?,
        Commands::Plan(args) => sync_cmd::run(&output, &config, &args, true)?,
        Commands::Backends => backends_cmd::run(&output, &config)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Routes library diagnostics to stderr
///
/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pkgsync_cli=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_type_list() {
        let cli = Cli::try_parse_from(["pkgsync", "sync", "--types", "brew,cask,npm", "-y"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(
            args.types,
            vec![BackendKind::Formula, BackendKind::Cask, BackendKind::Npm]
        );
        assert!(args.force);
    }

    #[test]
    fn prune_and_recreate_conflict() {
        assert!(Cli::try_parse_from(["pkgsync", "sync", "--prune", "--recreate"]).is_err());
    }

    #[test]
    fn policy_from_flags() {
        let mut config = Config::default();
        config.file.policy = Policy::PruneExtras;

        let args = SyncArgs::default();
        assert_eq!(args.policy(&config), Policy::PruneExtras);

        let args = SyncArgs {
            recreate: true,
            ..SyncArgs::default()
        };
        assert_eq!(args.policy(&config), Policy::RecreateExplicit);
    }
}
