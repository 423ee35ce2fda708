//! Parsers for package-manager listing output

use serde::Deserialize;
use std::collections::BTreeMap;

/// Shape of a backend's listing output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// One name per line (`brew tap`, `brew list --cask`)
    Lines,
    /// Name is the first whitespace-separated column (`mas list`)
    FirstColumn,
    /// `npm ls -g --depth=0 --json`: keys of `dependencies`
    NpmJson,
    /// `pnpm ls -g --depth=0 --json`: keys of `dependencies` in each entry
    PnpmJson,
    /// `pip list --format=json`: `name` of each entry
    PipJson,
    /// `yarn global list`: `info "name@version" has binaries:`
    YarnGlobal,
}

#[derive(Deserialize)]
struct NpmTree {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct PipEntry {
    name: String,
}

impl ListFormat {
    /// Extracts raw names; normalization happens in the caller
    pub fn parse(&self, stdout: &str) -> Result<Vec<String>, String> {
        match self {
            ListFormat::Lines => Ok(stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            ListFormat::FirstColumn => Ok(stdout
                .lines()
                .filter_map(|l| l.split_whitespace().next())
                .map(String::from)
                .collect()),
            ListFormat::NpmJson => {
                if stdout.trim().is_empty() {
                    return Ok(vec![]);
                }
                let tree: NpmTree = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
                Ok(tree.dependencies.into_keys().collect())
            }
            ListFormat::PnpmJson => {
                if stdout.trim().is_empty() {
                    return Ok(vec![]);
                }
                let trees: Vec<NpmTree> =
                    serde_json::from_str(stdout).map_err(|e| e.to_string())?;
                Ok(trees
                    .into_iter()
                    .flat_map(|t| t.dependencies.into_keys())
                    .collect())
            }
            ListFormat::PipJson => {
                if stdout.trim().is_empty() {
                    return Ok(vec![]);
                }
                let entries: Vec<PipEntry> =
                    serde_json::from_str(stdout).map_err(|e| e.to_string())?;
                Ok(entries.into_iter().map(|e| e.name).collect())
            }
            ListFormat::YarnGlobal => Ok(stdout
                .lines()
                .filter_map(|l| l.trim().strip_prefix("info \""))
                .filter_map(|rest| rest.split('"').next())
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()),
        }
    }
}
