//! Error types for the export worker.
//!
//! Every failure the pipeline can surface to a caller is a variant of
//! [`ExportError`]. Nothing here is retried internally: the worker is
//! stateless per job, so a caller can always resubmit the same inputs.

use thiserror::Error;

/// All errors surfaced by the export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The `export_config` payload is missing or malformed.
    ///
    /// Raised before any rendering work or filesystem side effect.
    #[error("invalid export configuration: {0}")]
    Configuration(String),

    /// The output filename's extension is not in the supported table.
    #[error("unrecognized output extension for '{filename}'")]
    UnrecognizedExtension { filename: String },

    /// An external renderer exited abnormally or failed to launch.
    ///
    /// Carries the adapter identity and the attempted command so failures
    /// can be diagnosed without reproducing the job.
    #[error("{adapter} failed: {detail} (command: {command})")]
    RenderFailed {
        adapter: &'static str,
        command: String,
        detail: String,
    },

    /// Press-ready output was requested with a color space other than CMYK.
    #[error("color space '{0}' is not supported for print output")]
    UnsupportedColorSpaceForPrint(String),

    /// The object storage backend rejected a bucket or upload operation.
    #[error("object storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Scratch filesystem operation failed.
    #[error("scratch I/O failed: {0}")]
    Scratch(#[from] std::io::Error),

    /// A blocking render task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failed_display_names_adapter_and_command() {
        let e = ExportError::RenderFailed {
            adapter: "inkscape",
            command: "inkscape /tmp/in.svg --export-pdf=/tmp/out.pdf".into(),
            detail: "exit status 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("inkscape"), "got: {msg}");
        assert!(msg.contains("--export-pdf"), "got: {msg}");
    }

    #[test]
    fn unsupported_print_color_space_display() {
        let e = ExportError::UnsupportedColorSpaceForPrint("rgb".into());
        assert!(e.to_string().contains("rgb"));
    }

    #[test]
    fn configuration_display() {
        let e = ExportError::Configuration("Target configuration not found".into());
        assert!(e.to_string().contains("Target configuration not found"));
    }
}
