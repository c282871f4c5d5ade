//! Pipeline orchestrator: routes one export job through its adapter stages.
//!
//! The orchestrator owns the per-job scratch workspace, threads temporary
//! paths between stages, deletes intermediates as soon as they are consumed,
//! and hands the finished artifact to the upload gateway. Route selection:
//!
//! - `raster`: payload saved to scratch, one ImageMagick stage.
//! - `vector-outline`: one Inkscape stage with text outlining.
//! - `pdf-standard`: Inkscape PDF intermediate, then Ghostscript.
//! - `pdf-x`: as pdf-standard with print intent; delivered as `.pdf`.
//! - `passthrough`: payload stored verbatim, no external process.
//!
//! Failure at any stage aborts the rest; whatever the job wrote to scratch
//! is removed on the way out, success or failure. The final artifact never
//! outlives delivery.

use crate::classify::{classify, Classification, OutputRoute};
use crate::error::ExportError;
use crate::job::{ExportJob, JobKind, JobResult, RenderParams};
use crate::render::{
    PdfPostProcessor, PrepressOptions, ProcessRunner, RasterConverter, RasterOptions,
    VectorRenderer, VectorTarget,
};
use crate::scratch::{ScratchStore, Workspace};
use crate::storage::ObjectStorage;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Default export resolution when the caller does not specify one.
pub const DEFAULT_DPI: u32 = 72;

/// Where a finished artifact should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Publish to object storage under the given bucket.
    Storage { bucket: String },
}

impl Destination {
    /// Validates an `export_config` document and extracts the destination.
    ///
    /// `target.type` is mandatory. `"storage"` additionally requires
    /// `target.config.bucket`; `"local"` means no upload (the artifact is
    /// returned inline). Anything else is a configuration error. This runs
    /// before any rendering work or filesystem side effect.
    pub fn from_config(config: &Value) -> Result<Option<Self>, ExportError> {
        let target = config
            .get("target")
            .ok_or_else(|| ExportError::Configuration("Target configuration not found".into()))?;

        let kind = target
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ExportError::Configuration("Type not found in target configuration".into())
            })?;

        match kind {
            "storage" => {
                let target_config = target.get("config").ok_or_else(|| {
                    ExportError::Configuration(
                        "Empty configuration not supported for storage target".into(),
                    )
                })?;
                let bucket = target_config
                    .get("bucket")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ExportError::Configuration("Bucket required for storage target".into())
                    })?;
                Ok(Some(Destination::Storage {
                    bucket: bucket.to_string(),
                }))
            }
            "local" => Ok(None),
            other => Err(ExportError::Configuration(format!(
                "Unsupported target type '{other}'"
            ))),
        }
    }
}

/// A finished export, ready for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    /// Published to object storage.
    Uploaded { url: String },
    /// No storage destination; artifact content returned inline.
    Inline {
        content: Vec<u8>,
        content_type: String,
    },
}

impl ExportOutput {
    pub fn into_job_result(self) -> JobResult {
        match self {
            ExportOutput::Uploaded { url } => JobResult::Url { url },
            ExportOutput::Inline {
                content,
                content_type,
            } => JobResult::Inline {
                content_base64: BASE64.encode(content),
                content_type,
            },
        }
    }
}

/// External renderer binaries and the ICC profile root.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub inkscape_bin: String,
    pub convert_bin: String,
    pub gs_bin: String,
    pub profiles_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inkscape_bin: "inkscape".to_string(),
            convert_bin: "convert".to_string(),
            gs_bin: "gs".to_string(),
            profiles_root: PathBuf::from("/usr/share/color/icc"),
        }
    }
}

impl EngineConfig {
    /// Reads per-engine overrides from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            inkscape_bin: std::env::var("INKSCAPE_BIN").unwrap_or(defaults.inkscape_bin),
            convert_bin: std::env::var("CONVERT_BIN").unwrap_or(defaults.convert_bin),
            gs_bin: std::env::var("GS_BIN").unwrap_or(defaults.gs_bin),
            profiles_root: std::env::var("ICC_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.profiles_root),
        }
    }
}

/// The export pipeline. Cheap to clone; all jobs share the adapters and the
/// injected storage gateway, but every job renders in its own workspace.
#[derive(Clone)]
pub struct Exporter {
    scratch: ScratchStore,
    vector: VectorRenderer,
    raster: RasterConverter,
    prepress: PdfPostProcessor,
    storage: Arc<dyn ObjectStorage>,
}

impl Exporter {
    pub fn new(
        scratch: ScratchStore,
        engines: EngineConfig,
        runner: Arc<dyn ProcessRunner>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            scratch,
            vector: VectorRenderer::new(engines.inkscape_bin, runner.clone()),
            raster: RasterConverter::new(
                engines.convert_bin,
                engines.profiles_root.clone(),
                runner.clone(),
            ),
            prepress: PdfPostProcessor::new(engines.gs_bin, engines.profiles_root, runner),
            storage,
        }
    }

    /// Runs one queued job end to end.
    pub async fn run_job(&self, job: &ExportJob) -> Result<JobResult, ExportError> {
        let output = match job.kind {
            JobKind::Export => {
                self.export(&job.payload, &job.filename, &job.export_config, &job.params)
                    .await?
            }
            JobKind::Upload => {
                self.upload(job.payload.as_bytes(), &job.filename, &job.export_config)
                    .await?
            }
        };
        Ok(output.into_job_result())
    }

    /// Renders `payload` to the format implied by `filename`, then runs the
    /// destination step.
    pub async fn export(
        &self,
        payload: &str,
        filename: &str,
        export_config: &Value,
        params: &RenderParams,
    ) -> Result<ExportOutput, ExportError> {
        let destination = Destination::from_config(export_config)?;
        if params.dpi == Some(0) {
            return Err(ExportError::Configuration(
                "dpi must be a positive integer".into(),
            ));
        }

        let classification = classify(filename)?;
        info!(
            filename,
            route = %classification.route,
            stored_name = %classification.stored_name,
            "Starting export"
        );

        // External renderers block; keep them off the async workers.
        let this = self.clone();
        let payload = payload.to_string();
        let params = params.clone();
        let class = classification.clone();
        let (workspace, final_path) =
            tokio::task::spawn_blocking(move || this.render_route(&payload, &class, &params))
                .await
                .map_err(|e| ExportError::Internal(format!("render task failed: {e}")))??;

        self.deliver(workspace, final_path, classification, destination)
            .await
    }

    /// Stores `content` verbatim under `filename`, bypassing rendering.
    pub async fn upload(
        &self,
        content: &[u8],
        filename: &str,
        export_config: &Value,
    ) -> Result<ExportOutput, ExportError> {
        let destination = Destination::from_config(export_config)?;
        let classification = classify(filename)?;
        info!(filename, "Starting verbatim upload");

        let workspace = self.scratch.workspace()?;
        let final_path = workspace.save(content, &classification.stored_name)?;

        self.deliver(workspace, final_path, classification, destination)
            .await
    }

    /// Executes the adapter stages for one route inside a fresh workspace.
    ///
    /// On error the workspace (and everything the job wrote) is dropped
    /// before the error propagates.
    fn render_route(
        &self,
        payload: &str,
        class: &Classification,
        params: &RenderParams,
    ) -> Result<(Workspace, PathBuf), ExportError> {
        let workspace = self.scratch.workspace()?;
        let final_path = workspace.path(&class.stored_name);

        match class.route {
            OutputRoute::Raster => {
                let input = workspace.save(payload.as_bytes(), "input.svg")?;
                let options = RasterOptions {
                    dpi: params.dpi.unwrap_or(DEFAULT_DPI),
                    size: params.width.zip(params.height),
                    color_space: params.color_space,
                    profile: params.profile.clone(),
                };
                self.raster.run(&input, &final_path, &options)?;
            }
            OutputRoute::VectorOutline => {
                let input = workspace.save(payload.as_bytes(), "input.svg")?;
                self.vector
                    .run(&input, &final_path, VectorTarget::PlainSvg, true)?;
            }
            OutputRoute::PdfStandard | OutputRoute::PdfX => {
                let options = PrepressOptions {
                    print: class.route == OutputRoute::PdfX,
                    color_space: params.color_space,
                    profile: params.profile.clone(),
                };
                // reject doomed press jobs before stage one
                options.validate()?;

                let input = workspace.save(payload.as_bytes(), "input.svg")?;
                let staged = workspace.unique_path(&format!("stage-{}", class.stored_name));
                self.vector.run(&input, &staged, VectorTarget::Pdf, true)?;
                self.prepress.run(&staged, &final_path, &options)?;

                // the staged PDF is dead weight once consumed
                if let Err(e) = workspace.delete(&staged) {
                    warn!(path = %staged.display(), error = %e, "Failed to delete intermediate");
                }
            }
            OutputRoute::Passthrough => {
                workspace.save(payload.as_bytes(), &class.stored_name)?;
            }
        }

        Ok((workspace, final_path))
    }

    /// Upload step: publishes or inlines the final artifact, then releases
    /// the workspace whatever the outcome.
    async fn deliver(
        &self,
        workspace: Workspace,
        final_path: PathBuf,
        class: Classification,
        destination: Option<Destination>,
    ) -> Result<ExportOutput, ExportError> {
        let result = match &destination {
            Some(Destination::Storage { bucket }) => {
                info!(%bucket, name = %class.stored_name, "Uploading artifact");
                match self.storage.ensure_bucket(bucket).await {
                    Ok(()) => self
                        .storage
                        .publish(bucket, &final_path, &class.stored_name, class.content_type)
                        .await
                        .map(|url| ExportOutput::Uploaded { url }),
                    Err(e) => Err(e),
                }
            }
            None => tokio::fs::read(&final_path)
                .await
                .map(|content| ExportOutput::Inline {
                    content,
                    content_type: class.content_type.to_string(),
                })
                .map_err(ExportError::from),
        };

        // scratch space is bounded: the artifact never outlives delivery
        drop(workspace);
        result
    }
}
