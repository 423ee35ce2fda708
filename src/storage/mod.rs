//! # Storage Layer
//!
//! Want lists and configuration on disk.
//!
//! ## Layout
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Want lists | One identifier per line | `<list_dir>/{backend}.txt` |
//! | Config | TOML | `<config dir>/config.toml` |
//!
//! Want lists are never written during a run.
//!
//! ## Key Types
//!
//! - [`ListStore`] - Loads and normalizes want lists
//! - [`Config`] - Configuration file plus resolution of the list directory

mod config;
mod list;

pub use config::{Config, ConfigError, FileConfig};
pub use list::{load as load_list, parse as parse_list, ListError, ListStore};
