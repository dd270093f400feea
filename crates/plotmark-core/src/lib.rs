#![forbid(unsafe_code)]

//! Point selection and viewport projection for annotating Plotly charts (headless).
//!
//! The engine has two halves:
//! - selection: walk the chart's traces under a fixed stride, read each point's `customdata`
//!   record and keep the points whose `url` matches the requested pull request
//! - projection: map a point's rendered data coordinate onto the overlay surface using the
//!   chart's current axis ranges
//!
//! Rendering the report and maintaining the marker overlay live in `plotmark-render`.

pub mod chart;
pub mod config;
pub mod error;
pub mod filter;
pub mod geom;
pub mod metadata;
pub mod projector;
pub mod select;
pub mod trace;
pub mod value;
pub mod walker;

pub use chart::ChartSnapshot;
pub use config::{PlotmarkConfig, Settings};
pub use error::{Error, Result};
pub use filter::FilterSpec;
pub use metadata::{MetaField, PointMetadata};
pub use projector::{Axis, AxisRange, ProjectionError, ResolvedPoint, ViewportState};
pub use select::{PointSelector, PointText, SelectedPoint, Selection, select_points};
pub use trace::Trace;
pub use walker::{TraceStride, TraceWalker};
