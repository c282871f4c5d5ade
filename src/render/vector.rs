//! Vector renderer adapter: Inkscape invocations.
//!
//! Handles SVG → PNG, SVG → PDF and SVG → plain-SVG conversions. Every
//! invocation disables the GUI and crops to the drawing's bounding box.
//! Resolution applies to PNG export only; PDF export from this stage is
//! resolution-independent. When outlining is requested every text object
//! becomes path geometry, so downstream stages never depend on font
//! availability.

use super::{execute, ProcessRunner, RenderCommand};
use crate::error::ExportError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Output kind for one Inkscape invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorTarget {
    Png { dpi: u32 },
    Pdf,
    PlainSvg,
}

/// Adapter around the Inkscape binary.
#[derive(Clone)]
pub struct VectorRenderer {
    program: String,
    runner: Arc<dyn ProcessRunner>,
}

impl VectorRenderer {
    pub const ADAPTER: &'static str = "inkscape";

    pub fn new(program: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Builds the command for one conversion without running it.
    pub fn command(
        &self,
        input: &Path,
        output: &Path,
        target: VectorTarget,
        text_to_path: bool,
    ) -> RenderCommand {
        let mut args = vec![
            input.display().to_string(),
            "--without-gui".to_string(),
            "--export-area-drawing".to_string(),
        ];

        match target {
            VectorTarget::Png { dpi } => {
                args.push(format!("--export-png={}", output.display()));
                args.push(format!("--export-dpi={dpi}"));
            }
            VectorTarget::Pdf => {
                args.push(format!("--export-pdf={}", output.display()));
            }
            VectorTarget::PlainSvg => {
                args.push(format!("--export-plain-svg={}", output.display()));
            }
        }

        if text_to_path {
            args.push("--export-text-to-path".to_string());
        }

        RenderCommand::new(&self.program, input, output, args)
    }

    /// Converts `input` to `output`, returning the output path.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        target: VectorTarget,
        text_to_path: bool,
    ) -> Result<PathBuf, ExportError> {
        info!(
            input = %input.display(),
            output = %output.display(),
            ?target,
            text_to_path,
            "Running vector renderer"
        );
        let command = self.command(input, output, target, text_to_path);
        execute(self.runner.as_ref(), Self::ADAPTER, &command)
    }
}
