//! Renderer adapters: external-process invocations behind a common contract.
//!
//! Each adapter wraps one rendering engine and follows the same shape:
//! `run(input, output, options) -> output path | RenderFailed`. An adapter
//! builds an immutable [`RenderCommand`] once per stage, hands it to a
//! [`ProcessRunner`], and maps any abnormal exit or launch failure to
//! [`ExportError::RenderFailed`] carrying the adapter name and the attempted
//! command. Adapters never retry.
//!
//! The [`ProcessRunner`] seam exists so each adapter is testable without the
//! engine binaries installed: tests substitute a fake runner and assert on
//! the constructed command.

pub mod prepress;
pub mod raster;
pub mod vector;

pub use prepress::{PdfPostProcessor, PrepressOptions};
pub use raster::{RasterConverter, RasterOptions};
pub use vector::{VectorRenderer, VectorTarget};

use crate::error::ExportError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// An immutable description of one external renderer invocation.
///
/// Built once per stage call and never mutated afterwards. The full argv is
/// kept verbatim so failed invocations can be reported exactly as attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    program: String,
    input: PathBuf,
    output: PathBuf,
    args: Vec<String>,
}

impl RenderCommand {
    pub fn new(
        program: impl Into<String>,
        input: &Path,
        output: &Path,
        args: Vec<String>,
    ) -> Self {
        Self {
            program: program.into(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument vector, excluding the program itself.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of waiting on an external renderer process.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

/// Executes a [`RenderCommand`] and reports how the process exited.
///
/// `Err` means the process could not be launched at all; an abnormal exit is
/// a successful run with `success == false`.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &RenderCommand) -> io::Result<RunOutcome>;
}

/// Production runner: spawns the process and waits for it, capturing stderr.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &RenderCommand) -> io::Result<RunOutcome> {
        let output = Command::new(command.program())
            .args(command.args())
            .output()?;

        Ok(RunOutcome {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Runs `command` through `runner`, mapping every failure mode to
/// [`ExportError::RenderFailed`] for `adapter`.
pub(crate) fn execute(
    runner: &dyn ProcessRunner,
    adapter: &'static str,
    command: &RenderCommand,
) -> Result<PathBuf, ExportError> {
    debug!(adapter, command = %command, "Invoking renderer");

    let outcome = runner
        .run(command)
        .map_err(|e| ExportError::RenderFailed {
            adapter,
            command: command.to_string(),
            detail: format!("failed to launch: {e}"),
        })?;

    if !outcome.success {
        let mut detail = match outcome.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        if !outcome.stderr.is_empty() {
            detail.push_str(": ");
            detail.push_str(&outcome.stderr);
        }
        return Err(ExportError::RenderFailed {
            adapter,
            command: command.to_string(),
            detail,
        });
    }

    Ok(command.output().to_path_buf())
}
