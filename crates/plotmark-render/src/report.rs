//! The HTML report written into the page's report container.
//!
//! Both variants list the selected points grouped by originating trace. Every interpolated
//! value is escaped, including point text.

use crate::Result;
use crate::fmt::{escape_html, safe_href};
use plotmark_core::metadata::PointMetadata;
use plotmark_core::{SelectedPoint, Selection};
use serde::Serialize;
use std::fmt::Write as _;

/// Inline style applied to the report container when it is first created.
pub const CONTAINER_STYLE: &str = "border:2px solid #8e44ad; padding:15px; margin-top:20px; font-family:Arial,sans-serif; background-color:#f4e6f7;";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportVariant {
    /// Report only.
    Extract,
    /// Report accompanying on-chart markers.
    #[default]
    Annotate,
}

impl ReportVariant {
    pub fn title(self, filter_description: &str) -> String {
        match self {
            ReportVariant::Extract => format!(
                "Extracted Plotly Data (Even-Indexed Traces, Filter: {filter_description})"
            ),
            ReportVariant::Annotate => format!("Tracked Points (Filter: {filter_description})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub title: String,
    pub filter: String,
    pub total_points: usize,
    pub traces: Vec<TraceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSummary {
    pub trace_index: usize,
    pub trace_name: String,
    pub points: Vec<PointSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSummary {
    /// 1-based position within the trace.
    pub point_number: usize,
    pub arg_id: String,
    pub url: String,
    pub text: String,
}

impl PointSummary {
    fn from_point(point: &SelectedPoint) -> Self {
        Self {
            point_number: point.point_index + 1,
            arg_id: point
                .metadata
                .arg_id
                .display(PointMetadata::ARG_ID_FIELD)
                .into_owned(),
            url: point.metadata.url.display(PointMetadata::URL_FIELD).into_owned(),
            text: point.text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRenderer {
    variant: ReportVariant,
}

impl ReportRenderer {
    pub fn new(variant: ReportVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> ReportVariant {
        self.variant
    }

    pub fn summary(&self, selection: &Selection) -> ReportSummary {
        ReportSummary {
            title: self.variant.title(selection.filter_description()),
            filter: selection.filter_description().to_string(),
            total_points: selection.len(),
            traces: selection
                .groups()
                .map(|group| TraceSummary {
                    trace_index: group.trace_index,
                    trace_name: group.trace_name.to_string(),
                    points: group.points.iter().map(PointSummary::from_point).collect(),
                })
                .collect(),
        }
    }

    pub fn render_json(&self, selection: &Selection) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary(selection))?)
    }

    pub fn render_html(&self, selection: &Selection) -> String {
        let summary = self.summary(selection);
        let mut out = String::new();
        let _ = write!(&mut out, "<h2>{}</h2>", escape_html(&summary.title));
        for trace in &summary.traces {
            self.render_trace(&mut out, trace);
        }
        out
    }

    fn render_trace(&self, out: &mut String, trace: &TraceSummary) {
        let suffix = match self.variant {
            ReportVariant::Extract => " (Even Index)",
            ReportVariant::Annotate => "",
        };
        let _ = write!(
            out,
            "<h3>Trace {}: {}{suffix}</h3><ul>",
            trace.trace_index,
            escape_html(&trace.trace_name)
        );
        for point in &trace.points {
            let origin = match self.variant {
                ReportVariant::Extract => "in original trace".to_string(),
                ReportVariant::Annotate => format!("Trace {}", trace.trace_index),
            };
            let _ = write!(
                out,
                concat!(
                    "<li>Point {number} ({origin}): ",
                    "<strong>arg_id:</strong> {arg_id}, ",
                    "<strong>url:</strong> <a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{url}</a>, ",
                    "<strong>text:</strong> {text}</li>"
                ),
                number = point.point_number,
                origin = origin,
                arg_id = escape_html(&point.arg_id),
                href = safe_href(&point.url),
                url = escape_html(&point.url),
                text = escape_html(&point.text),
            );
        }
        out.push_str("</ul>");
    }
}
