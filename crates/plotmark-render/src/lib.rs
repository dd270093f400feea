#![forbid(unsafe_code)]

//! Presentation for plotmark selections.
//!
//! - [`report`]: the HTML report (and its JSON summary) written into the page's report container
//! - [`marker`]: circle markers and their styling
//! - [`overlay`]: keeps one marker per selected point in sync with the chart's current view
//! - [`svg`]: an in-memory marker surface that serializes to a standalone SVG document

pub mod marker;
pub mod overlay;
pub mod report;
pub mod svg;

mod fmt;

pub use marker::{Marker, MarkerStyle};
pub use overlay::{
    ChartView, MarkerFailure, MarkerSurface, OverlayManager, RedrawReport, SkippedMarker,
    ViewChangeHandler, ViewChangeSource,
};
pub use report::{ReportRenderer, ReportSummary, ReportVariant};
pub use svg::SvgMarkerLayer;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] plotmark_core::Error),
    #[error("report summary JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("marker surface error: {message}")]
    Surface { message: String },
    #[error("report container error: {message}")]
    Container { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
