#![forbid(unsafe_code)]

//! `plotmark` finds the points of a Plotly chart that belong to one GitHub pull request, lists
//! them in an HTML report and keeps a circle marker over each of them while the chart is
//! panned, zoomed or resized.
//!
//! The pipeline ([`session`]) is host-agnostic: a [`session::Page`] supplies the prompt, the
//! notifications and the chart/surface/container lookups. [`memory`] provides a headless page
//! used by the CLI and tests; `plotmark-web` drives the same pipeline against a live page.
//!
//! # Features
//!
//! - `raster`: rasterize the marker overlay to PNG (`plotmark::render::raster`)

pub use plotmark_core::*;

pub mod memory;
pub mod session;

pub mod render {
    pub use plotmark_render::marker::MARKER_INLINE_STYLE;
    pub use plotmark_render::report::CONTAINER_STYLE;
    pub use plotmark_render::{
        ChartView, Error, Marker, MarkerFailure, MarkerStyle, MarkerSurface, OverlayManager,
        RedrawReport, ReportRenderer, ReportSummary, ReportVariant, Result, SkippedMarker,
        SvgMarkerLayer, ViewChangeHandler, ViewChangeSource,
    };

    #[cfg(feature = "raster")]
    pub mod raster;
}

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Core(#[from] plotmark_core::Error),
    #[error(transparent)]
    Render(#[from] plotmark_render::Error),
}

impl HeadlessError {
    /// The underlying pipeline error, when the failure came from filtering or chart lookup.
    pub fn core(&self) -> Option<&plotmark_core::Error> {
        match self {
            HeadlessError::Core(err) => Some(err),
            HeadlessError::Render(plotmark_render::Error::Core(err)) => Some(err),
            HeadlessError::Render(_) => None,
        }
    }
}

pub type HeadlessResult<T> = std::result::Result<T, HeadlessError>;
