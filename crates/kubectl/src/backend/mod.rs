//! Process execution abstraction.
//!
//! The [`Runner`] trait is the only place the engine touches the outside
//! world. [`process::ProcessRunner`] executes real `kubectl` processes;
//! tests substitute a scripted runner.

pub mod process;

use crate::command::KubectlCommand;
use crate::error::Result;

/// What to do with the child's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stdout {
    /// Capture it and return it to the caller
    Capture,
    /// Throw it away
    Discard,
}

/// Executes a single kubectl invocation.
///
/// Implementations block until the process exits and never retry.
pub trait Runner: Send + Sync {
    /// Run `command`, feeding `input` on standard input when given.
    ///
    /// Returns captured standard output (empty when discarded). A non-zero
    /// exit or a failure to start yields [`crate::Error::Execution`].
    fn run(&self, command: &KubectlCommand, input: Option<&str>, stdout: Stdout)
    -> Result<String>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(
        &self,
        command: &KubectlCommand,
        input: Option<&str>,
        stdout: Stdout,
    ) -> Result<String> {
        (**self).run(command, input, stdout)
    }
}

/// Get the default runner (real processes).
pub fn default_runner() -> process::ProcessRunner {
    process::ProcessRunner
}
