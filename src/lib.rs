//! WireTuner Export Worker Library
//!
//! This library provides the core functionality for the SVG export worker
//! service: a multi-format rendering pipeline (raster, outlined SVG, PDF and
//! press-ready PDF/X) with optional publication to object storage.
//!
//! ## Module Overview
//!
//! - `classify`: output filename → pipeline route + content type
//! - `scratch`: per-job scratch workspaces with guaranteed cleanup
//! - `render`: adapters around the external renderer binaries
//!   (Inkscape, ImageMagick, Ghostscript)
//! - `pipeline`: the orchestrator that chains adapter stages per route
//! - `storage`: object storage boundary for published exports
//! - `job`: job models and state management
//! - `queue`: Redis-based job queue operations
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use worker_export::{
//!     job::RenderParams,
//!     pipeline::{EngineConfig, Exporter},
//!     render::SystemRunner,
//!     scratch::ScratchStore,
//!     storage::S3Gateway,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Exporter::new(
//!         ScratchStore::new(std::env::temp_dir().join("exports"))?,
//!         EngineConfig::from_env(),
//!         Arc::new(SystemRunner),
//!         Arc::new(S3Gateway::from_env(None).await),
//!     );
//!
//!     let config = serde_json::json!({
//!         "target": {"type": "storage", "config": {"bucket": "exports"}}
//!     });
//!     let output = exporter
//!         .export("<svg></svg>", "design.pdf", &config, &RenderParams::default())
//!         .await?;
//!     println!("{output:?}");
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod queue;
pub mod render;
pub mod scratch;
pub mod storage;
pub mod telemetry;
