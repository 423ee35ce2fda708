//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `sync` | Reconcile backends against their want lists |
//! | `plan` | Same as `sync --dry-run` |
//! | `backends` | List backends, list files and availability |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! pkgsync --verbose plan --types brew,cask
//! ```
//!
//! ## Exit Status
//!
//! Non-zero only when the run cannot start (bad config, missing list
//! directory). Failed items are reported, not fatal.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod backends_cmd;
mod output;
mod sync_cmd;

pub use app::{run, Cli, Commands, SyncArgs};
pub use output::{Output, OutputFormat};
pub use sync_cmd::render_text;
