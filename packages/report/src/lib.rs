#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Renderers for the batch report and the dashboard.
//!
//! - [`charts`] draws chart specs to PNG files with `plotters`.
//! - [`pdf`] assembles the summary, blackspots and chart images into a
//!   multi-page PDF.
//! - [`map`] produces a self-contained Leaflet HTML map.
//! - [`geojson`] exports blackspots as a GeoJSON feature collection.

pub mod charts;
pub mod geojson;
pub mod map;
pub mod pdf;

pub use charts::{
    BLACKSPOT_CHART_FILE, chart_file_name, render_blackspot_chart, render_chart, render_charts,
};
pub use map::{
    DEFAULT_MARKER_LIMIT, MapOptions, MarkerColoring, render_incident_map, write_incident_map,
};
pub use pdf::{DEFAULT_REPORT_FILE, PdfOptions, generate_pdf_report};
pub use self::geojson::{BLACKSPOTS_FILE, blackspot_features, write_blackspots_geojson};

use thiserror::Error;

/// Errors from rendering report artifacts.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A chart could not be drawn or encoded.
    #[error("Failed to render chart '{title}': {message}")]
    Chart {
        /// Title of the failing chart.
        title: String,
        /// Backend error message.
        message: String,
    },

    /// PDF assembly failed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// A chart image could not be decoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
