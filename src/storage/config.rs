//! Configuration handling for pkgsync
//!
//! Configuration is read from `config.toml` in the platform config directory
//! (e.g. `~/.config/pkgsync/config.toml`), or from an explicit path. Every
//! key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BackendKind, Policy};

/// Configuration errors; all of them abort the run before any batch starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Conflicting configuration: {0}")]
    Conflict(String),

    #[error("Want-list directory does not exist: {0}")]
    ListDirMissing(PathBuf),

    #[error("Want-list path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Could not determine a config directory; pass --dir")]
    NoConfigDir,
}

fn default_true() -> bool {
    true
}

fn default_apps_dir() -> PathBuf {
    PathBuf::from("/Applications")
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding the want lists
    pub list_dir: Option<PathBuf>,

    /// Default reconciliation policy
    pub policy: Policy,

    /// Skip confirmation prompts
    pub force: bool,

    /// Run the backend cleanup pass after mutating batches
    #[serde(default = "default_true")]
    pub cleanup: bool,

    /// Only these backends (empty means all)
    pub enabled: Vec<BackendKind>,

    /// Never these backends
    pub disabled: Vec<BackendKind>,

    /// Scan root for manually installed apps
    #[serde(default = "default_apps_dir")]
    pub apps_dir: PathBuf,

    /// Scan root for browser extensions
    pub extensions_dir: Option<PathBuf>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            list_dir: None,
            policy: Policy::InstallMissing,
            force: false,
            cleanup: true,
            enabled: vec![],
            disabled: vec![],
            apps_dir: default_apps_dir(),
            extensions_dir: None,
        }
    }
}

/// Loaded configuration plus where it came from
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    pub source: Option<PathBuf>,
}

impl Config {
    /// Returns the platform config directory
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "pkgsync", "pkgsync").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Default location of `config.toml`
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Loads configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self {
            file: Self::parse(&content, &path)?,
            source: Some(path),
        };
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<FileConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Rejects settings that contradict each other
    pub fn validate(&self) -> Result<(), ConfigError> {
        let both: Vec<&str> = self
            .file
            .enabled
            .iter()
            .filter(|k| self.file.disabled.contains(*k))
            .map(|k| k.as_str())
            .collect();

        if !both.is_empty() {
            return Err(ConfigError::Conflict(format!(
                "backend(s) both enabled and disabled: {}",
                both.join(", ")
            )));
        }
        Ok(())
    }

    /// Resolves the want-list directory and checks that it exists
    ///
    /// `override_dir` (from `--dir` or `PKGSYNC_DIR`) wins over the config
    /// file, which wins over `<config dir>/lists`.
    pub fn resolve_list_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let dir = match (override_dir, &self.file.list_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => Self::config_dir()
                .map(|d| d.join("lists"))
                .ok_or(ConfigError::NoConfigDir)?,
        };

        if !dir.exists() {
            return Err(ConfigError::ListDirMissing(dir));
        }
        if !dir.is_dir() {
            return Err(ConfigError::NotADirectory(dir));
        }
        Ok(dir)
    }

    /// Backends to process, in catalogue order
    ///
    /// `only` narrows further (the `--types` filter); empty means no filter.
    pub fn selected_kinds(&self, only: &[BackendKind]) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|k| self.file.enabled.is_empty() || self.file.enabled.contains(k))
            .filter(|k| !self.file.disabled.contains(k))
            .filter(|k| only.is_empty() || only.contains(k))
            .collect()
    }

    /// Browser extension scan root
    pub fn extensions_dir(&self) -> Option<PathBuf> {
        self.file.extensions_dir.clone().or_else(|| {
            BaseDirs::new().map(|dirs| {
                dirs.data_dir()
                    .join("Google")
                    .join("Chrome")
                    .join("Default")
                    .join("Extensions")
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.file.policy, Policy::InstallMissing);
        assert!(config.file.cleanup);
        assert!(!config.file.force);
        assert_eq!(config.file.apps_dir, PathBuf::from("/Applications"));
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
list_dir = "/Users/me/dotfiles/lists"
policy = "prune_extras"
force = true
cleanup = false
disabled = ["yarn", "mas"]
apps_dir = "/tmp/apps"
"#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(file.list_dir, Some(PathBuf::from("/Users/me/dotfiles/lists")));
        assert_eq!(file.policy, Policy::PruneExtras);
        assert!(file.force);
        assert!(!file.cleanup);
        assert_eq!(file.disabled, vec![BackendKind::Yarn, BackendKind::AppStore]);
        assert_eq!(file.apps_dir, PathBuf::from("/tmp/apps"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let file: FileConfig = toml::from_str("force = true").unwrap();
        assert!(file.cleanup);
        assert_eq!(file.apps_dir, PathBuf::from("/Applications"));
    }

    #[test]
    fn load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "policy = \"recreate_explicit\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.file.policy, Policy::RecreateExplicit);
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn unparseable_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "policy = 42\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn enabled_and_disabled_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "enabled = [\"npm\", \"pip\"]\ndisabled = [\"pip\"]\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Conflict(_)));
        assert!(err.to_string().contains("pip"));
    }

    #[test]
    fn list_dir_override_wins() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.file.list_dir = Some(PathBuf::from("/definitely/not/here"));

        let resolved = config.resolve_list_dir(Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path());

        assert!(matches!(
            config.resolve_list_dir(None),
            Err(ConfigError::ListDirMissing(_))
        ));
    }

    #[test]
    fn list_dir_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "").unwrap();

        assert!(matches!(
            Config::default().resolve_list_dir(Some(&file)),
            Err(ConfigError::NotADirectory(_))
        ));
    }

    #[test]
    fn selected_kinds_filtering() {
        let mut config = Config::default();
        assert_eq!(config.selected_kinds(&[]).len(), BackendKind::ALL.len());

        config.file.disabled = vec![BackendKind::Yarn];
        let kinds = config.selected_kinds(&[]);
        assert!(!kinds.contains(&BackendKind::Yarn));

        config.file.enabled = vec![BackendKind::Npm, BackendKind::Formula];
        assert_eq!(
            config.selected_kinds(&[]),
            vec![BackendKind::Formula, BackendKind::Npm]
        );
        assert_eq!(
            config.selected_kinds(&[BackendKind::Npm, BackendKind::Pip]),
            vec![BackendKind::Npm]
        );
    }
}
