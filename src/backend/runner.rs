//! External process execution
//!
//! Adapters talk to package managers only through [`Runner`], so tests can
//! script command output without touching the machine.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::BackendError;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit status and stderr
    pub fn failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Converts a non-zero exit into [`BackendError::CommandFailed`]
    pub fn check(self, command: &str) -> Result<Self, BackendError> {
        if self.success {
            Ok(self)
        } else {
            Err(BackendError::CommandFailed {
                command: command.to_string(),
                status: self.status.clone(),
                stderr: last_line(&self.stderr),
            })
        }
    }
}

/// Last non-empty line, which is where package managers put the actual error
fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Runs external programs
pub trait Runner {
    /// Runs a program to completion, capturing its output
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, BackendError>;

    /// Locates a program, returning its path if it can be run
    fn find_program(&self, program: &str) -> Option<PathBuf>;
}

/// Runs real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, BackendError> {
        let command_line = display_command(program, args);
        tracing::debug!(command = %command_line, "running");

        // stdin stays attached: some installers ask for a password
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .output()
            .map_err(|source| BackendError::Spawn {
                command: command_line,
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            status: output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        find_in_path(program)
    }
}

/// Searches `PATH` for an executable
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Checks if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = path.metadata() {
            return meta.is_file() && meta.permissions().mode() & 0o111 != 0;
        }
    }

    #[cfg(windows)]
    {
        if let Some(ext) = path.extension() {
            return path.is_file() && (ext == "exe" || ext == "bat" || ext == "cmd");
        }
    }

    false
}

/// Renders a command for messages: `brew install --cask zed`
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
