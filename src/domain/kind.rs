//! Backend kinds and their identity rules
//!
//! Each kind carries its quirks as data: which want-list file it reads, how a
//! want-list line becomes an [`Identifier`], which identifiers may never be
//! removed, and which policies it can honour.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::Identifier;

/// One package or app source
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Homebrew taps
    Tap,
    /// Homebrew formulae
    #[value(name = "brew")]
    #[serde(rename = "brew")]
    Formula,
    /// Homebrew casks
    Cask,
    /// Mac App Store apps via `mas`
    #[value(name = "mas")]
    #[serde(rename = "mas")]
    AppStore,
    /// Global npm packages
    Npm,
    /// Global yarn packages
    Yarn,
    /// Global pnpm packages
    Pnpm,
    /// User-site pip packages
    Pip,
    /// Manually installed applications (report-only)
    Apps,
    /// Browser extensions (report-only)
    Extensions,
}

/// How a want-list line is reduced to an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    /// The whole trimmed line, with the backend's version rule applied
    Plain,
    /// `ID # comment`; ID must be all ASCII digits
    NumericId,
    /// `ID # comment`; ID must be at least 16 lowercase ASCII letters
    ExtensionId,
}

/// How a version suffix is stripped from an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRule {
    /// Identifier is used as-is
    None,
    /// Strip a trailing `@version`, keeping a leading `@scope/`
    AtSuffix,
    /// Strip a trailing `==version`
    PinSuffix,
    /// Strip a trailing `.app`
    AppBundle,
}

/// What a backend can do, independent of what is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Install/uninstall primitives exist; false for report-only backends
    pub mutating: bool,
    /// RecreateExplicit may be applied
    pub recreate: bool,
    /// Teardown proceeds by iterative leaf removal
    pub leaf_removal: bool,
    /// A wanted package already present as a dependency must be reinstalled
    /// to be marked explicit
    pub reinstall_promotes: bool,
}

/// Minimum length of a browser extension identifier
pub const EXTENSION_ID_MIN_LEN: usize = 16;

/// Marker that starts a comment in a want list
pub const COMMENT_MARKER: char = '#';

impl BackendKind {
    /// All kinds in processing order
    pub const ALL: [BackendKind; 10] = [
        BackendKind::Tap,
        BackendKind::Formula,
        BackendKind::Cask,
        BackendKind::AppStore,
        BackendKind::Npm,
        BackendKind::Yarn,
        BackendKind::Pnpm,
        BackendKind::Pip,
        BackendKind::Apps,
        BackendKind::Extensions,
    ];

    /// Short name used on the command line and in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tap => "tap",
            BackendKind::Formula => "brew",
            BackendKind::Cask => "cask",
            BackendKind::AppStore => "mas",
            BackendKind::Npm => "npm",
            BackendKind::Yarn => "yarn",
            BackendKind::Pnpm => "pnpm",
            BackendKind::Pip => "pip",
            BackendKind::Apps => "apps",
            BackendKind::Extensions => "extensions",
        }
    }

    /// Human label for prompts ("Install 3 formulae?")
    pub fn noun(&self) -> &'static str {
        match self {
            BackendKind::Tap => "tap(s)",
            BackendKind::Formula => "formula(e)",
            BackendKind::Cask => "cask(s)",
            BackendKind::AppStore => "App Store app(s)",
            BackendKind::Npm => "npm package(s)",
            BackendKind::Yarn => "yarn package(s)",
            BackendKind::Pnpm => "pnpm package(s)",
            BackendKind::Pip => "pip package(s)",
            BackendKind::Apps => "app(s)",
            BackendKind::Extensions => "extension(s)",
        }
    }

    /// Want-list file name inside the list directory
    pub fn list_file(&self) -> &'static str {
        match self {
            BackendKind::Tap => "taps.txt",
            BackendKind::Formula => "formulae.txt",
            BackendKind::Cask => "casks.txt",
            BackendKind::AppStore => "appstore.txt",
            BackendKind::Npm => "npm.txt",
            BackendKind::Yarn => "yarn.txt",
            BackendKind::Pnpm => "pnpm.txt",
            BackendKind::Pip => "pip.txt",
            BackendKind::Apps => "apps.txt",
            BackendKind::Extensions => "extensions.txt",
        }
    }

    pub fn line_shape(&self) -> LineShape {
        match self {
            BackendKind::AppStore => LineShape::NumericId,
            BackendKind::Extensions => LineShape::ExtensionId,
            _ => LineShape::Plain,
        }
    }

    pub fn version_rule(&self) -> VersionRule {
        match self {
            BackendKind::Npm | BackendKind::Yarn | BackendKind::Pnpm => VersionRule::AtSuffix,
            BackendKind::Pip => VersionRule::PinSuffix,
            BackendKind::Apps => VersionRule::AppBundle,
            _ => VersionRule::None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            BackendKind::Formula => Capabilities {
                mutating: true,
                recreate: true,
                leaf_removal: true,
                reinstall_promotes: true,
            },
            BackendKind::Pip => Capabilities {
                mutating: true,
                recreate: true,
                leaf_removal: false,
                reinstall_promotes: false,
            },
            BackendKind::Apps | BackendKind::Extensions => Capabilities {
                mutating: false,
                recreate: false,
                leaf_removal: false,
                reinstall_promotes: false,
            },
            _ => Capabilities {
                mutating: true,
                recreate: false,
                leaf_removal: false,
                reinstall_promotes: false,
            },
        }
    }

    /// Identifiers that are never uninstalled, whatever the policy
    pub fn protected(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Npm | BackendKind::Pnpm => &["npm", "corepack", "pnpm"],
            BackendKind::Pip => &["pip", "setuptools", "wheel"],
            _ => &[],
        }
    }

    pub fn is_protected(&self, id: &Identifier) -> bool {
        self.protected().iter().any(|p| *p == id.as_str())
    }

    /// Applies the version rule to a raw package reference
    pub fn strip_version<'a>(&self, raw: &'a str) -> &'a str {
        match self.version_rule() {
            VersionRule::None => raw,
            VersionRule::AtSuffix => match raw.rfind('@') {
                Some(at) if at > 0 => &raw[..at],
                _ => raw,
            },
            VersionRule::PinSuffix => raw.split("==").next().unwrap_or(raw).trim_end(),
            VersionRule::AppBundle => raw.strip_suffix(".app").unwrap_or(raw),
        }
    }

    /// Normalizes one want-list line; `None` means the line is excluded
    pub fn normalize_line(&self, line: &str) -> Option<Identifier> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            return None;
        }

        match self.line_shape() {
            // Only app names may contain spaces
            LineShape::Plain if *self != BackendKind::Apps && line.contains(char::is_whitespace) => {
                None
            }
            LineShape::Plain => Identifier::new(self.strip_version(line)).ok(),
            LineShape::NumericId => {
                let field = leading_field(line);
                if !field.is_empty() && field.chars().all(|c| c.is_ascii_digit()) {
                    Identifier::new(field).ok()
                } else {
                    None
                }
            }
            LineShape::ExtensionId => {
                let field = leading_field(line);
                if is_extension_id(field) {
                    Identifier::new(field).ok()
                } else {
                    None
                }
            }
        }
    }

    /// Normalizes a name reported by the live backend
    pub fn normalize_installed(&self, raw: &str) -> Option<Identifier> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self.line_shape() {
            LineShape::Plain => Identifier::new(self.strip_version(raw)).ok(),
            LineShape::NumericId => raw
                .chars()
                .all(|c| c.is_ascii_digit())
                .then(|| Identifier::new(raw).ok())
                .flatten(),
            LineShape::ExtensionId => is_extension_id(raw)
                .then(|| Identifier::new(raw).ok())
                .flatten(),
        }
    }
}

/// Field before the comment marker, trimmed
fn leading_field(line: &str) -> &str {
    line.split(COMMENT_MARKER).next().unwrap_or("").trim()
}

fn is_extension_id(field: &str) -> bool {
    field.len() >= EXTENSION_ID_MIN_LEN && field.chars().all(|c| c.is_ascii_lowercase())
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown backend: {}", s))
    }
}
