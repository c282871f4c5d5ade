//! Raster/profile adapter: ImageMagick `convert` invocations.
//!
//! Consumes an SVG (or an intermediate) and produces a raster image at the
//! requested resolution. When a color space and a profile name are both
//! given, the named ICC profile is applied during conversion; the profile is
//! looked up at `<profiles root>/<color space>/<profile>.icc`. Without a
//! color space the conversion runs direct, no profile.

use super::{execute, ProcessRunner, RenderCommand};
use crate::error::ExportError;
use crate::job::ColorSpace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Options for one rasterisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOptions {
    pub dpi: u32,
    /// Optional `WxH` geometry hint.
    pub size: Option<(u32, u32)>,
    pub color_space: Option<ColorSpace>,
    pub profile: Option<String>,
}

/// Adapter around ImageMagick's `convert` binary.
#[derive(Clone)]
pub struct RasterConverter {
    program: String,
    profiles_root: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl RasterConverter {
    pub const ADAPTER: &'static str = "convert";

    pub fn new(
        program: impl Into<String>,
        profiles_root: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            profiles_root: profiles_root.into(),
            runner,
        }
    }

    /// Resolves the ICC profile path for a color space + profile name pair.
    pub fn profile_path(&self, color_space: ColorSpace, profile: &str) -> PathBuf {
        self.profiles_root
            .join(color_space.as_str())
            .join(format!("{profile}.icc"))
    }

    /// Builds the command for one conversion without running it.
    pub fn command(&self, input: &Path, output: &Path, options: &RasterOptions) -> RenderCommand {
        let mut args = vec![
            input.display().to_string(),
            "-density".to_string(),
            options.dpi.to_string(),
        ];

        if let Some((width, height)) = options.size {
            args.push("-size".to_string());
            args.push(format!("{width}x{height}"));
        }

        if let (Some(color_space), Some(profile)) = (options.color_space, &options.profile) {
            args.push("-profile".to_string());
            args.push(self.profile_path(color_space, profile).display().to_string());
        }

        args.push(output.display().to_string());

        RenderCommand::new(&self.program, input, output, args)
    }

    /// Rasterises `input` into `output`, returning the output path.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        options: &RasterOptions,
    ) -> Result<PathBuf, ExportError> {
        info!(
            input = %input.display(),
            output = %output.display(),
            dpi = options.dpi,
            color_space = ?options.color_space,
            "Running raster converter"
        );
        let command = self.command(input, output, options);
        execute(self.runner.as_ref(), Self::ADAPTER, &command)
    }
}
