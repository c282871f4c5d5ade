//! Output classification: filename extension → pipeline route + content type.
//!
//! The table is closed. Every supported extension maps to exactly one route;
//! anything else is rejected with [`ExportError::UnrecognizedExtension`]
//! before any external process runs. Classification is pure: no side effects,
//! same answer every time.

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The rendering stage sequence chosen for an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputRoute {
    /// Single rasterisation stage via ImageMagick.
    Raster,
    /// Single Inkscape stage producing plain SVG with text outlined.
    VectorOutline,
    /// Inkscape PDF followed by Ghostscript post-processing.
    PdfStandard,
    /// Inkscape PDF followed by press-ready PDF/X packaging.
    PdfX,
    /// Payload stored verbatim, no external process.
    Passthrough,
}

impl fmt::Display for OutputRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputRoute::Raster => write!(f, "raster"),
            OutputRoute::VectorOutline => write!(f, "vector-outline"),
            OutputRoute::PdfStandard => write!(f, "pdf-standard"),
            OutputRoute::PdfX => write!(f, "pdf-x"),
            OutputRoute::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// Result of classifying a target filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub route: OutputRoute,
    pub content_type: &'static str,
    /// Name the final artifact is stored and published under.
    ///
    /// Identical to the requested filename except for `.pdfx`, where the
    /// trailing `x` is stripped: PDF/X output is delivered as `.pdf`.
    pub stored_name: String,
}

/// Classifies a target filename by its final dot-suffix (case-sensitive).
pub fn classify(filename: &str) -> Result<Classification, ExportError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .ok_or_else(|| ExportError::UnrecognizedExtension {
            filename: filename.to_string(),
        })?;

    let (route, content_type) = match extension {
        "jpg" | "jpeg" => (OutputRoute::Raster, "image/jpeg"),
        "png" => (OutputRoute::Raster, "image/png"),
        "svg" => (OutputRoute::VectorOutline, "image/svg+xml"),
        "pdf" => (OutputRoute::PdfStandard, "application/pdf"),
        "pdfx" => (OutputRoute::PdfX, "application/pdf"),
        "json" => (OutputRoute::Passthrough, "application/json"),
        "html" => (OutputRoute::Passthrough, "text/html"),
        _ => {
            return Err(ExportError::UnrecognizedExtension {
                filename: filename.to_string(),
            })
        }
    };

    let stored_name = match route {
        // design.pdfx is delivered as design.pdf
        OutputRoute::PdfX => filename[..filename.len() - 1].to_string(),
        _ => filename.to_string(),
    };

    Ok(Classification {
        route,
        content_type,
        stored_name,
    })
}
