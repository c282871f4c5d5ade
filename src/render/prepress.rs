//! PDF post-processor adapter: Ghostscript invocations.
//!
//! Consumes a PDF produced by the vector renderer and performs color-space
//! remapping and, for print intent, PDF/X packaging. The option table:
//!
//! | print | color space | behavior                                          |
//! |-------|-------------|---------------------------------------------------|
//! | false | any         | ICC output override; cmyk adds the CMYK settings  |
//! | false | none        | ICC output override only                          |
//! | true  | cmyk        | CMYK settings plus PDF/X packaging                |
//! | true  | not cmyk    | rejected, UnsupportedColorSpaceForPrint           |
//!
//! The CMYK settings force the CMYK conversion strategy, the CMYK process
//! model, rendering intent 3 (relative colorimetric) and gray-to-K. The
//! print check happens before any process is spawned.

use super::{execute, ProcessRunner, RenderCommand};
use crate::error::ExportError;
use crate::job::ColorSpace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Options for one post-processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepressOptions {
    /// Press-ready PDF/X output requested.
    pub print: bool,
    pub color_space: Option<ColorSpace>,
    pub profile: Option<String>,
}

impl PrepressOptions {
    /// Rejects print intent with a non-CMYK color space.
    ///
    /// The orchestrator calls this before the first pipeline stage so a
    /// doomed press job never spawns a renderer at all.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.print && self.color_space != Some(ColorSpace::Cmyk) {
            let name = self
                .color_space
                .map(|cs| cs.to_string())
                .unwrap_or_else(|| "none".to_string());
            return Err(ExportError::UnsupportedColorSpaceForPrint(name));
        }
        Ok(())
    }
}

/// Adapter around the Ghostscript binary.
#[derive(Clone)]
pub struct PdfPostProcessor {
    program: String,
    profiles_root: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl PdfPostProcessor {
    pub const ADAPTER: &'static str = "ghostscript";

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

    /// Builds the command for one pass, or rejects unsupported print input.
    pub fn command(
        &self,
        input: &Path,
        output: &Path,
        options: &PrepressOptions,
    ) -> Result<RenderCommand, ExportError> {
        options.validate()?;

        let mut args = vec![
            "-dBATCH".to_string(),
            "-dNOPAUSE".to_string(),
            "-dSAFER".to_string(),
            "-sDEVICE=pdfwrite".to_string(),
            "-dOverrideICC=true".to_string(),
        ];

        if let (Some(color_space), Some(profile)) = (options.color_space, &options.profile) {
            let path = self
                .profiles_root
                .join(color_space.as_str())
                .join(format!("{profile}.icc"));
            args.push(format!("-sOutputICCProfile={}", path.display()));
        }

        if options.color_space == Some(ColorSpace::Cmyk) {
            args.push("-sColorConversionStrategy=CMYK".to_string());
            args.push("-dProcessColorModel=/DeviceCMYK".to_string());
            // rendering intent 3: relative colorimetric
            args.push("-dRenderIntent=3".to_string());
            args.push("-dDeviceGrayToK=true".to_string());
        }

        if options.print {
            args.push("-dPDFX=true".to_string());
            args.push("-dPDFSETTINGS=/prepress".to_string());
        }

        args.push("-o".to_string());
        args.push(output.display().to_string());
        args.push(input.display().to_string());

        Ok(RenderCommand::new(&self.program, input, output, args))
    }

    /// Post-processes `input` into `output`, returning the output path.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        options: &PrepressOptions,
    ) -> Result<PathBuf, ExportError> {
        info!(
            input = %input.display(),
            output = %output.display(),
            print = options.print,
            color_space = ?options.color_space,
            "Running PDF post-processor"
        );
        let command = self.command(input, output, options)?;
        execute(self.runner.as_ref(), Self::ADAPTER, &command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::FakeRunner;

    fn processor(runner: Arc<FakeRunner>) -> PdfPostProcessor {
        PdfPostProcessor::new("gs", "/usr/share/color/icc", runner)
    }

    fn args_for(options: &PrepressOptions) -> Vec<String> {
        let runner = Arc::new(FakeRunner::default());
        processor(runner)
            .command(
                Path::new("/scratch/stage.pdf"),
                Path::new("/scratch/out.pdf"),
                options,
            )
            .unwrap()
            .args()
            .to_vec()
    }

    #[test]
    fn screen_output_without_color_space_only_overrides_icc() {
        let args = args_for(&PrepressOptions {
            print: false,
            color_space: None,
            profile: None,
        });

        assert!(args.contains(&"-dOverrideICC=true".to_string()));
        assert!(!args.iter().any(|a| a.contains("ColorConversionStrategy")));
        assert!(!args.contains(&"-dPDFX=true".to_string()));
    }

    #[test]
    fn cmyk_screen_output_forces_cmyk_conversion() {
        let args = args_for(&PrepressOptions {
            print: false,
            color_space: Some(ColorSpace::Cmyk),
            profile: Some("coated_fogra39".to_string()),
        });

        assert!(args.contains(&"-sColorConversionStrategy=CMYK".to_string()));
        assert!(args.contains(&"-dProcessColorModel=/DeviceCMYK".to_string()));
        assert!(args.contains(&"-dRenderIntent=3".to_string()));
        assert!(args.contains(&"-dDeviceGrayToK=true".to_string()));
        assert!(args.contains(
            &"-sOutputICCProfile=/usr/share/color/icc/cmyk/coated_fogra39.icc".to_string()
        ));
        assert!(!args.contains(&"-dPDFX=true".to_string()));
    }

    #[test]
    fn print_with_cmyk_adds_pdfx_packaging() {
        let args = args_for(&PrepressOptions {
            print: true,
            color_space: Some(ColorSpace::Cmyk),
            profile: None,
        });

        assert!(args.contains(&"-sColorConversionStrategy=CMYK".to_string()));
        assert!(args.contains(&"-dPDFX=true".to_string()));
        assert!(args.contains(&"-dPDFSETTINGS=/prepress".to_string()));
    }

    #[test]
    fn print_without_cmyk_is_rejected_before_invocation() {
        let runner = Arc::new(FakeRunner::default());
        let p = processor(runner.clone());

        for color_space in [Some(ColorSpace::Rgb), Some(ColorSpace::Gray), None] {
            let err = p
                .run(
                    Path::new("/scratch/stage.pdf"),
                    Path::new("/scratch/out.pdf"),
                    &PrepressOptions {
                        print: true,
                        color_space,
                        profile: None,
                    },
                )
                .unwrap_err();
            assert!(matches!(
                err,
                ExportError::UnsupportedColorSpaceForPrint(_)
            ));
        }
        // the process never ran
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn output_and_input_are_trailing_arguments() {
        let args = args_for(&PrepressOptions {
            print: false,
            color_space: None,
            profile: None,
        });
        let n = args.len();
        assert_eq!(args[n - 3], "-o");
        assert_eq!(args[n - 2], "/scratch/out.pdf");
        assert_eq!(args[n - 1], "/scratch/stage.pdf");
    }
}
