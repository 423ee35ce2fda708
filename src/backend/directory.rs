//! Report-only adapters backed by a directory scan
//!
//! Manually installed apps and browser extensions cannot be installed or
//! removed from here; they are only compared against their want lists.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{BackendKind, Identifier, InstalledState};

use super::{Backend, BackendError};

/// Lists entries of a directory as installed identifiers
pub struct DirectoryBackend {
    kind: BackendKind,
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(kind: BackendKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unsupported(&self, operation: &'static str) -> BackendError {
        BackendError::Unsupported {
            kind: self.kind,
            operation,
        }
    }
}

impl Backend for DirectoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn query(&self) -> Result<InstalledState, BackendError> {
        let scan_err = |source: std::io::Error| BackendError::Scan {
            path: self.root.clone(),
            source,
        };

        let mut found = BTreeSet::new();
        for entry in fs::read_dir(&self.root).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if self.kind == BackendKind::Apps && !name.ends_with(".app") {
                continue;
            }
            if let Some(id) = self.kind.normalize_installed(name) {
                found.insert(id);
            }
        }

        Ok(InstalledState::flat(found))
    }

    fn install(&self, _id: &Identifier) -> Result<(), BackendError> {
        Err(self.unsupported("install"))
    }

    fn uninstall(&self, _id: &Identifier) -> Result<(), BackendError> {
        Err(self.unsupported("uninstall"))
    }
}
