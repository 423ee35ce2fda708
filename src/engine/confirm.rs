//! Confirmation gate for mutating batches

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::domain::{BackendKind, Identifier};

use super::report::BatchKind;

/// Number of identifiers spelled out in a prompt before eliding
const PROMPT_PREVIEW: usize = 10;

/// A pending batch awaiting approval
#[derive(Debug, Clone)]
pub struct Prompt<'a> {
    pub kind: BackendKind,
    pub batch: BatchKind,
    pub items: &'a [Identifier],
}

impl fmt::Display for Prompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.batch.verb(),
            self.items.len(),
            self.kind.noun()
        )?;

        let shown: Vec<&str> = self
            .items
            .iter()
            .take(PROMPT_PREVIEW)
            .map(Identifier::as_str)
            .collect();
        if !shown.is_empty() {
            write!(f, ": {}", shown.join(", "))?;
        }
        if self.items.len() > PROMPT_PREVIEW {
            write!(f, ", ... ({} more)", self.items.len() - PROMPT_PREVIEW)?;
        }
        Ok(())
    }
}

/// Decides whether a batch may proceed
pub trait Confirm {
    fn confirm(&mut self, prompt: &Prompt<'_>) -> bool;
}

/// Approves everything (unattended runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &Prompt<'_>) -> bool {
        true
    }
}

/// Asks on a line-oriented terminal; anything but `y`/`yes` declines
pub struct LinePrompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl LinePrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr, reads answers from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, prompt: &Prompt<'_>) -> bool {
        if write!(self.output, "{}? [y/N] ", prompt).is_err() || self.output.flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            // EOF (closed stdin) declines
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}
