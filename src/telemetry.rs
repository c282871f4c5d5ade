//! Telemetry and structured logging for the export worker.

use crate::job::{ExportJob, JobStatus};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};

/// Records telemetry for a completed or failed job.
///
/// Emits structured logs and OpenTelemetry spans for monitoring export
/// pipeline health: job duration, success/failure status, target filename
/// and error messages for failures.
pub fn record_job_telemetry(job: &ExportJob) {
    let tracer = global::tracer("export-worker");
    let mut span = tracer.start("export_job");

    // Add span attributes
    span.set_attribute(KeyValue::new("job_id", job.job_id.clone()));
    span.set_attribute(KeyValue::new("filename", job.filename.clone()));
    span.set_attribute(KeyValue::new("kind", format!("{:?}", job.kind)));
    span.set_attribute(KeyValue::new("status", job.status.to_string()));

    if let Some(document_id) = &job.document_id {
        span.set_attribute(KeyValue::new("document_id", document_id.clone()));
    }

    if let Some(duration_ms) = job.processing_duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        // Log performance metrics
        info!(
            job_id = %job.job_id,
            filename = %job.filename,
            duration_ms = duration_ms,
            status = %job.status,
            "Export job completed"
        );

        // Warn if exceeding performance threshold (30 seconds; the pipeline
        // may chain two external renderers per job)
        if duration_ms > 30_000 {
            warn!(
                job_id = %job.job_id,
                duration_ms = duration_ms,
                "Export exceeded performance threshold (30000ms)"
            );
        }
    }

    // Record error details if job failed
    if job.status == JobStatus::Failed {
        if let Some(ref error) = job.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
            warn!(
                job_id = %job.job_id,
                filename = %job.filename,
                error = %error,
                "Export job failed"
            );
        }
    }

    span.end();
}

/// Records a worker heartbeat for monitoring worker health.
///
/// This should be called periodically by the worker loop to signal
/// that the worker is alive and processing jobs.
pub fn record_worker_heartbeat(queue_length: usize) {
    let tracer = global::tracer("export-worker");
    let mut span = tracer.start("worker_heartbeat");

    span.set_attribute(KeyValue::new("queue_length", queue_length as i64));
    span.end();

    info!(queue_length = queue_length, "Worker heartbeat");
}

/// Initializes OpenTelemetry with OTLP exporter.
///
/// This should be called once at worker startup. Reads configuration
/// from environment variables:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - Collector endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - Service name (default: export-worker)
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "export-worker".to_string());

    // Initialize OTLP exporter
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    global::set_tracer_provider(tracer.provider().unwrap());

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}
