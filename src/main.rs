//! Export Worker Service
//!
//! This worker consumes export jobs from a Redis queue and processes them
//! through the multi-format rendering pipeline (Inkscape, ImageMagick,
//! Ghostscript), publishing finished artifacts to object storage.
//!
//! ## Architecture
//!
//! - **Queue**: Redis list (`wiretuner:export:jobs:queue`)
//! - **Status**: Redis keys (`wiretuner:export:jobs:status:{job_id}`)
//! - **Pipeline**: route-based renderer chaining with per-job scratch space
//! - **Storage**: S3-backed upload gateway for published exports
//! - **Telemetry**: OpenTelemetry OTLP export
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_URL`: Redis connection string (default: redis://127.0.0.1/)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint
//! - `WORKER_CONCURRENCY`: Number of concurrent workers (default: 4)
//! - `SCRATCH_DIR`: Scratch root for working files (default: under the
//!   system temp directory)
//! - `ICC_PROFILE_DIR`: Root of the ICC profile tree (default:
//!   /usr/share/color/icc)
//! - `INKSCAPE_BIN` / `CONVERT_BIN` / `GS_BIN`: Renderer binary overrides
//! - `S3_PUBLIC_URL`: Public base URL for published artifacts (default:
//!   virtual-hosted AWS form); AWS credentials/region from the usual
//!   environment
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use redis::Client;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker_export::job::ExportJob;
use worker_export::pipeline::{EngineConfig, Exporter};
use worker_export::queue::JobQueue;
use worker_export::render::SystemRunner;
use worker_export::scratch::ScratchStore;
use worker_export::storage::S3Gateway;
use worker_export::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize OpenTelemetry
    if let Err(e) = telemetry::init_telemetry() {
        warn!("Failed to initialize telemetry: {}", e);
    }

    info!("Starting export worker service");

    // Load configuration
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4);
    let scratch_dir = std::env::var("SCRATCH_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("wiretuner-exports"));
    let public_base_url = std::env::var("S3_PUBLIC_URL").ok();
    let engines = EngineConfig::from_env();

    info!(
        "Configuration: redis_url={}, concurrency={}, scratch_dir={}",
        redis_url,
        concurrency,
        scratch_dir.display()
    );

    // Connect to Redis
    let client = Client::open(redis_url.as_str()).context("Failed to create Redis client")?;
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis");

    // Create shared resources
    let scratch = ScratchStore::new(scratch_dir).context("Failed to create scratch root")?;
    let storage = Arc::new(S3Gateway::from_env(public_base_url).await);
    let exporter = Exporter::new(scratch, engines, Arc::new(SystemRunner), storage);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    // Spawn worker tasks
    let mut handles = vec![];
    for worker_id in 0..concurrency {
        let conn = conn.clone();
        let semaphore = semaphore.clone();
        let exporter = exporter.clone();

        let handle =
            tokio::spawn(async move { worker_loop(worker_id, conn, semaphore, exporter).await });

        handles.push(handle);
    }

    // Wait for shutdown signal
    info!("Worker service ready, press Ctrl+C to shutdown");
    signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    info!("Received shutdown signal, waiting for workers to finish...");

    // Wait for all workers to complete
    for handle in handles {
        let _ = handle.await;
    }

    info!("Worker service shutdown complete");
    Ok(())
}

/// Main worker loop that processes jobs from the queue.
///
/// This function runs indefinitely until the process is terminated.
/// It uses a semaphore to limit concurrent job processing.
async fn worker_loop(
    worker_id: usize,
    conn: redis::aio::ConnectionManager,
    semaphore: Arc<Semaphore>,
    exporter: Exporter,
) {
    let mut queue = JobQueue::new(conn);

    info!("Worker {} started", worker_id);

    loop {
        // Dequeue next job (blocks with timeout)
        let job = match queue.dequeue().await {
            Ok(Some(job)) => job,
            Ok(None) => {
                // Timeout, no job available
                continue;
            }
            Err(e) => {
                error!("Worker {} failed to dequeue job: {}", worker_id, e);
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        // Acquire semaphore permit
        let permit = semaphore.clone().acquire_owned().await.unwrap();

        // Spawn job processing task
        let mut queue_clone = JobQueue::new(queue.conn.clone());
        let exporter = exporter.clone();

        tokio::spawn(async move {
            process_job(job, &mut queue_clone, &exporter).await;
            drop(permit); // Release semaphore
        });

        // Record heartbeat every 10 jobs
        if let Ok(queue_len) = queue.queue_length().await {
            if queue_len % 10 == 0 {
                telemetry::record_worker_heartbeat(queue_len);
            }
        }
    }
}

/// Processes a single export job.
///
/// This function handles the complete job lifecycle:
/// 1. Mark job as processing
/// 2. Run the rendering pipeline (or verbatim upload) and destination step
/// 3. Mark job as complete or failed
/// 4. Record telemetry
///
/// There is no retry: a failed job stays failed and the caller resubmits.
async fn process_job(mut job: ExportJob, queue: &mut JobQueue, exporter: &Exporter) {
    info!(
        "Processing job: job_id={}, kind={:?}, filename={}",
        job.job_id, job.kind, job.filename
    );

    // Mark as processing
    job.start_processing();
    if let Err(e) = queue.update_status(&job).await {
        error!("Failed to update job status: {}", e);
    }

    // Run the pipeline
    let result = exporter.run_job(&job).await;

    match result {
        Ok(job_result) => {
            // Mark as complete
            job.mark_complete(job_result);
            if let Err(e) = queue.update_status(&job).await {
                error!("Failed to update job status: {}", e);
            }

            info!(
                "Job completed: job_id={}, duration_ms={:?}",
                job.job_id,
                job.processing_duration_ms()
            );
        }
        Err(e) => {
            // Mark as failed
            let error_msg = e.to_string();
            error!("Job failed: job_id={}, error={}", job.job_id, error_msg);

            job.mark_failed(error_msg);
            if let Err(e) = queue.update_status(&job).await {
                error!("Failed to update job status: {}", e);
            }
        }
    }

    // Record telemetry
    telemetry::record_job_telemetry(&job);
}
