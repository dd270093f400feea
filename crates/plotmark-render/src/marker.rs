use crate::fmt::{escape_html, fmt};
use plotmark_core::config::MarkerSettings;
use plotmark_core::geom::PixelPoint;
use serde::Serialize;

/// Inline style every marker carries so it never intercepts chart interaction.
pub const MARKER_INLINE_STYLE: &str = "pointer-events: none";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub class_name: String,
    pub radius: f64,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl From<&MarkerSettings> for MarkerStyle {
    fn from(settings: &MarkerSettings) -> Self {
        Self {
            class_name: settings.class_name.clone(),
            radius: settings.radius,
            fill: settings.fill.clone(),
            stroke: settings.stroke.clone(),
            stroke_width: settings.stroke_width,
        }
    }
}

impl MarkerStyle {
    pub fn marker_at(&self, center: PixelPoint, trace_index: usize, point_index: usize) -> Marker {
        Marker {
            center,
            trace_index,
            point_index,
            style: self.clone(),
        }
    }
}

/// A circle drawn over one selected point, in overlay surface pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    #[serde(serialize_with = "serialize_point")]
    pub center: PixelPoint,
    pub trace_index: usize,
    pub point_index: usize,
    pub style: MarkerStyle,
}

fn serialize_point<S: serde::Serializer>(p: &PixelPoint, s: S) -> Result<S::Ok, S::Error> {
    [p.x, p.y].serialize(s)
}

impl Marker {
    pub fn class_name(&self) -> &str {
        &self.style.class_name
    }

    /// Attributes in the order they are set on the `<circle>` element.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("class", self.style.class_name.clone()),
            ("cx", fmt(self.center.x)),
            ("cy", fmt(self.center.y)),
            ("r", fmt(self.style.radius)),
            ("fill", self.style.fill.clone()),
            ("stroke", self.style.stroke.clone()),
            ("stroke-width", fmt(self.style.stroke_width)),
            ("style", MARKER_INLINE_STYLE.to_string()),
            ("data-trace-index", self.trace_index.to_string()),
            ("data-point-index", self.point_index.to_string()),
        ]
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::from("<circle");
        for (name, value) in self.attributes() {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(&value));
            out.push('"');
        }
        out.push_str("/>");
        out
    }
}
