//! Want-list storage
//!
//! Want lists live as one text file per backend inside the list directory
//! (e.g. `formulae.txt`, `npm.txt`). Files are read under a shared lock.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::domain::{BackendKind, Identifier};

#[derive(Debug, Error)]
pub enum ListError {
    #[error("Failed to read want list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads want lists from a directory
#[derive(Debug, Clone)]
pub struct ListStore {
    dir: PathBuf,
}

impl ListStore {
    /// Creates a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the list directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the want list for a backend
    pub fn path_for(&self, kind: BackendKind) -> PathBuf {
        self.dir.join(kind.list_file())
    }

    /// Returns true if the backend has a want list
    pub fn exists(&self, kind: BackendKind) -> bool {
        self.path_for(kind).is_file()
    }

    /// Loads the want list for a backend
    ///
    /// A missing file is an empty set.
    pub fn load(&self, kind: BackendKind) -> Result<BTreeSet<Identifier>, ListError> {
        load(&self.path_for(kind), kind)
    }
}

/// Loads and normalizes a want-list file
///
/// Blank lines, comment lines and lines failing the backend's shape check
/// are dropped; duplicates collapse.
pub fn load(path: &Path, kind: BackendKind) -> Result<BTreeSet<Identifier>, ListError> {
    let read_err = |source: io::Error| ListError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(read_err(e)),
    };

    file.lock_shared().map_err(read_err)?;

    let reader = BufReader::new(&file);
    let mut ids = BTreeSet::new();
    for line in reader.lines() {
        let line = line.map_err(read_err)?;
        if let Some(id) = kind.normalize_line(&line) {
            ids.insert(id);
        }
    }

    // Lock is released when file is dropped
    Ok(ids)
}

/// Parses want-list content already in memory
pub fn parse(content: &str, kind: BackendKind) -> BTreeSet<Identifier> {
    content
        .lines()
        .filter_map(|line| kind.normalize_line(line))
        .collect()
}
