//! Package identifiers
//!
//! An [`Identifier`] is the normalized key a backend uses for one package,
//! app, tap or extension. Identifiers are case- and whitespace-sensitive and
//! compare lexicographically, which gives every set of them a deterministic
//! processing order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier has surrounding whitespace: '{0}'")]
    Untrimmed(String),

    #[error("Identifier contains a control character: {0:?}")]
    ControlCharacter(String),
}

/// A normalized package identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier
    ///
    /// Inner spaces are kept (`Visual Studio Code`); empty values, leading or
    /// trailing whitespace and control characters are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        if value.trim() != value {
            return Err(IdError::Untrimmed(value));
        }
        if value.chars().any(char::is_control) {
            return Err(IdError::ControlCharacter(value));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last `/`-separated segment
    ///
    /// `homebrew/cask-fonts/font-fira-code` -> `font-fira-code`.
    /// Identifiers without a slash are returned unchanged.
    pub fn trailing_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
