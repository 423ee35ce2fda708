//! pkgsync - reconcile installed packages against plain-text want lists
//!
//! Each package source (Homebrew taps, formulae and casks, the App Store,
//! npm, yarn, pnpm, pip, plus report-only app and extension scans) has a
//! want list. A run snapshots what is installed, plans the installs and
//! removals needed under the chosen policy, and executes them item by item.

pub mod backend;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod storage;

pub use domain::{ActionPlan, BackendKind, Identifier, InstalledState, Policy};
pub use engine::{RunReport, Session};
