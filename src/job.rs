//! Job models and state management for the export queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Color space applied during raster or PDF color conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Cmyk,
    Rgb,
    Gray,
}

impl ColorSpace {
    /// Directory component under the ICC profile root.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorSpace::Cmyk => "cmyk",
            ColorSpace::Rgb => "rgb",
            ColorSpace::Gray => "gray",
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rendering parameters supplied by the caller.
///
/// `dpi` is only consulted on rasterising routes; a plain-SVG export carries
/// no resolution. `width`/`height` are raster geometry hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderParams {
    #[serde(default)]
    pub dpi: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub color_space: Option<ColorSpace>,
    #[serde(default)]
    pub profile: Option<String>,
}

/// What the worker is asked to do with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Run the rendering pipeline, then the destination step.
    Export,
    /// Store the payload verbatim; rendering is bypassed.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Where a completed job's artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobResult {
    /// Published to object storage under a durable public URL.
    Url { url: String },
    /// No destination was configured; the artifact rides on the status
    /// record itself, base64-encoded.
    Inline {
        content_base64: String,
        content_type: String,
    },
}

/// Export job request and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: String,
    pub document_id: Option<String>,
    pub kind: JobKind,
    /// SVG document text for exports, verbatim content for uploads.
    pub payload: String,
    pub filename: String,
    pub params: RenderParams,
    /// Destination descriptor, validated by the pipeline before any work.
    pub export_config: serde_json::Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
    pub result: Option<JobResult>,
}

impl ExportJob {
    pub fn new(
        kind: JobKind,
        payload: String,
        filename: String,
        params: RenderParams,
        export_config: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            document_id: None,
            kind,
            payload,
            filename,
            params,
            export_config,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            error: None,
            result: None,
        }
    }

    pub fn start_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn mark_complete(&mut self, result: JobResult) {
        self.status = JobStatus::Complete;
        self.updated_at = Utc::now();
        self.error = None;
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
        self.error = Some(error);
    }

    pub fn processing_duration_ms(&self) -> Option<i64> {
        if self.status == JobStatus::Complete || self.status == JobStatus::Failed {
            Some(
                self.updated_at
                    .signed_duration_since(self.created_at)
                    .num_milliseconds(),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> ExportJob {
        ExportJob::new(
            JobKind::Export,
            "<svg/>".to_string(),
            "design.pdf".to_string(),
            RenderParams::default(),
            json!({"target": {"type": "storage", "config": {"bucket": "exports"}}}),
        )
    }

    #[test]
    fn new_job_is_queued_without_result() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.error.is_none());
        assert!(job.result.is_none());
        assert!(job.processing_duration_ms().is_none());
    }

    #[test]
    fn lifecycle_transitions() {
        let mut job = sample_job();

        job.start_processing();
        assert_eq!(job.status, JobStatus::Processing);

        job.mark_complete(JobResult::Url {
            url: "https://exports.example/design.pdf".to_string(),
        });
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.processing_duration_ms().is_some());
    }

    #[test]
    fn failed_job_keeps_error() {
        let mut job = sample_job();
        job.start_processing();
        job.mark_failed("ghostscript failed".to_string());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("ghostscript failed"));
        assert!(job.result.is_none());
    }

    #[test]
    fn job_round_trips_through_json() {
        let job = sample_job();
        let json = serde_json::to_string(&job).unwrap();
        let back: ExportJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id, job.job_id);
        assert_eq!(back.kind, JobKind::Export);
        assert_eq!(back.status, JobStatus::Queued);
    }
}
