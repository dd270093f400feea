//! Data-space to pixel-space projection for the overlay.
//!
//! The chart maps each axis range linearly onto the drawing surface. Pixel `y` grows downward
//! while data `y` grows upward, so the vertical axis is flipped:
//!
//! ```text
//! px = (x - x0) / (x1 - x0) * width
//! py = height - (y - y0) / (y1 - y0) * height
//! ```
//!
//! Ranges are taken in the order the chart reports them, so reversed axes (`x0 > x1`) project
//! correctly without special handling.

use crate::geom::{DataPoint, PixelPoint, PixelSize, data_point, pixel_point};
use crate::value::json_f64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// `[start, end]` of an axis, as in `layout.xaxis.range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: f64,
    pub end: f64,
}

impl AxisRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.start.is_finite() && self.end.is_finite()) || self.start == self.end
    }

    /// Reads a two-element numeric array. Anything else (date strings, wrong arity) is `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [start, end] => Some(Self::new(json_f64(start)?, json_f64(end)?)),
            _ => None,
        }
    }

    /// Parses `"min,max"`.
    pub fn parse(text: &str) -> Option<Self> {
        let (a, b) = text.split_once(',')?;
        let start = a.trim().parse::<f64>().ok()?;
        let end = b.trim().parse::<f64>().ok()?;
        Some(Self::new(start, end))
    }

    fn proportion(&self, v: f64) -> f64 {
        (v - self.start) / self.span()
    }
}

/// A data coordinate as rendered by the chart. Either component may be undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl ResolvedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("{axis} axis range is not available")]
    MissingRange { axis: Axis },
    #[error("{axis} axis range [{start}, {end}] is degenerate")]
    DegenerateRange { axis: Axis, start: f64, end: f64 },
    #[error("{axis} coordinate is undefined")]
    UndefinedCoordinate { axis: Axis },
    #[error("{axis} coordinate does not land on a finite pixel")]
    NonFinitePixel { axis: Axis },
}

/// Snapshot of the chart's view, read fresh for every redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub surface: PixelSize,
}

impl ViewportState {
    pub fn new(x_range: AxisRange, y_range: AxisRange, surface: PixelSize) -> Self {
        Self {
            x_range,
            y_range,
            surface,
        }
    }

    /// Builds a viewport from possibly-missing ranges.
    pub fn capture(
        x_range: Option<AxisRange>,
        y_range: Option<AxisRange>,
        surface: PixelSize,
    ) -> Result<Self, ProjectionError> {
        let x_range = x_range.ok_or(ProjectionError::MissingRange { axis: Axis::X })?;
        let y_range = y_range.ok_or(ProjectionError::MissingRange { axis: Axis::Y })?;
        Ok(Self::new(x_range, y_range, surface))
    }

    fn checked_range(&self, axis: Axis) -> Result<AxisRange, ProjectionError> {
        let range = match axis {
            Axis::X => self.x_range,
            Axis::Y => self.y_range,
        };
        if range.is_degenerate() {
            return Err(ProjectionError::DegenerateRange {
                axis,
                start: range.start,
                end: range.end,
            });
        }
        Ok(range)
    }

    pub fn project(&self, point: ResolvedPoint) -> Result<PixelPoint, ProjectionError> {
        let x = defined(point.x, Axis::X)?;
        let y = defined(point.y, Axis::Y)?;
        self.project_data(data_point(x, y))
    }

    pub fn project_data(&self, point: DataPoint) -> Result<PixelPoint, ProjectionError> {
        let x_range = self.checked_range(Axis::X)?;
        let y_range = self.checked_range(Axis::Y)?;
        let px = x_range.proportion(point.x) * self.surface.width;
        let py = self.surface.height - y_range.proportion(point.y) * self.surface.height;
        if !px.is_finite() {
            return Err(ProjectionError::NonFinitePixel { axis: Axis::X });
        }
        if !py.is_finite() {
            return Err(ProjectionError::NonFinitePixel { axis: Axis::Y });
        }
        Ok(pixel_point(px, py))
    }

    /// Inverse of [`ViewportState::project_data`]. Needs a non-empty surface.
    pub fn unproject(&self, pixel: PixelPoint) -> Result<DataPoint, ProjectionError> {
        let x_range = self.checked_range(Axis::X)?;
        let y_range = self.checked_range(Axis::Y)?;
        if self.surface.width == 0.0 {
            return Err(ProjectionError::DegenerateRange {
                axis: Axis::X,
                start: 0.0,
                end: self.surface.width,
            });
        }
        if self.surface.height == 0.0 {
            return Err(ProjectionError::DegenerateRange {
                axis: Axis::Y,
                start: 0.0,
                end: self.surface.height,
            });
        }
        let x = x_range.start + pixel.x / self.surface.width * x_range.span();
        let y = y_range.start + (self.surface.height - pixel.y) / self.surface.height * y_range.span();
        Ok(data_point(x, y))
    }
}

fn defined(v: Option<f64>, axis: Axis) -> Result<f64, ProjectionError> {
    v.filter(|v| v.is_finite())
        .ok_or(ProjectionError::UndefinedCoordinate { axis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::pixel_size;
    use serde_json::json;

    fn viewport() -> ViewportState {
        ViewportState::new(
            AxisRange::new(0.0, 10.0),
            AxisRange::new(-5.0, 5.0),
            pixel_size(200.0, 100.0),
        )
    }

    #[test]
    fn projects_corners_and_center() {
        let vp = viewport();
        assert_eq!(vp.project(ResolvedPoint::new(0.0, -5.0)).unwrap(), pixel_point(0.0, 100.0));
        assert_eq!(vp.project(ResolvedPoint::new(10.0, 5.0)).unwrap(), pixel_point(200.0, 0.0));
        assert_eq!(vp.project(ResolvedPoint::new(5.0, 0.0)).unwrap(), pixel_point(100.0, 50.0));
    }

    #[test]
    fn points_outside_the_range_project_off_surface() {
        let p = viewport().project(ResolvedPoint::new(20.0, 10.0)).unwrap();
        assert_eq!(p, pixel_point(400.0, -50.0));
    }

    #[test]
    fn reversed_axis_flips_direction() {
        let vp = ViewportState::new(
            AxisRange::new(10.0, 0.0),
            AxisRange::new(0.0, 1.0),
            pixel_size(100.0, 100.0),
        );
        let p = vp.project(ResolvedPoint::new(2.5, 0.0)).unwrap();
        assert_eq!(p, pixel_point(75.0, 100.0));
    }

    #[test]
    fn round_trip_within_tolerance() {
        let vp = ViewportState::new(
            AxisRange::new(-3.7, 12.25),
            AxisRange::new(1e3, 1.5e3),
            pixel_size(733.0, 411.5),
        );
        for (x, y) in [(0.1, 1000.0), (-3.7, 1499.99), (7.77, 1234.5), (12.25, 1e3)] {
            let px = vp.project(ResolvedPoint::new(x, y)).unwrap();
            let back = vp.unproject(px).unwrap();
            assert!((back.x - x).abs() < 1e-9, "x {x} -> {}", back.x);
            assert!((back.y - y).abs() < 1e-9, "y {y} -> {}", back.y);
        }
    }

    #[test]
    fn degenerate_ranges_fail() {
        let vp = ViewportState::new(
            AxisRange::new(1.0, 1.0),
            AxisRange::new(0.0, 1.0),
            pixel_size(10.0, 10.0),
        );
        assert!(matches!(
            vp.project(ResolvedPoint::new(1.0, 0.5)),
            Err(ProjectionError::DegenerateRange { axis: Axis::X, .. })
        ));

        let vp = ViewportState::new(
            AxisRange::new(0.0, 1.0),
            AxisRange::new(f64::NAN, 1.0),
            pixel_size(10.0, 10.0),
        );
        assert!(matches!(
            vp.project(ResolvedPoint::new(0.5, 0.5)),
            Err(ProjectionError::DegenerateRange { axis: Axis::Y, .. })
        ));
    }

    #[test]
    fn undefined_coordinates_fail() {
        let vp = viewport();
        let err = vp
            .project(ResolvedPoint { x: None, y: Some(1.0) })
            .unwrap_err();
        assert_eq!(err, ProjectionError::UndefinedCoordinate { axis: Axis::X });
        let err = vp
            .project(ResolvedPoint { x: Some(1.0), y: Some(f64::INFINITY) })
            .unwrap_err();
        assert_eq!(err, ProjectionError::UndefinedCoordinate { axis: Axis::Y });
    }

    #[test]
    fn overflowing_spans_fail_instead_of_drawing_nan() {
        let vp = ViewportState::new(
            AxisRange::new(-1e308, 1e308),
            AxisRange::new(0.0, 1.0),
            pixel_size(100.0, 100.0),
        );
        assert_eq!(
            vp.project(ResolvedPoint::new(1e308, 0.5)).unwrap_err(),
            ProjectionError::NonFinitePixel { axis: Axis::X }
        );

        let vp = ViewportState::new(
            AxisRange::new(0.0, 1.0),
            AxisRange::new(0.0, 1e-300),
            pixel_size(100.0, 1e300),
        );
        assert_eq!(
            vp.project(ResolvedPoint::new(0.5, 1e10)).unwrap_err(),
            ProjectionError::NonFinitePixel { axis: Axis::Y }
        );
    }

    #[test]
    fn capture_requires_both_ranges() {
        let size = pixel_size(1.0, 1.0);
        assert_eq!(
            ViewportState::capture(None, Some(AxisRange::new(0.0, 1.0)), size).unwrap_err(),
            ProjectionError::MissingRange { axis: Axis::X }
        );
        assert!(ViewportState::capture(
            Some(AxisRange::new(0.0, 1.0)),
            Some(AxisRange::new(0.0, 1.0)),
            size
        )
        .is_ok());
    }

    #[test]
    fn axis_range_parsing() {
        assert_eq!(AxisRange::from_json(&json!([0, 2.5])), Some(AxisRange::new(0.0, 2.5)));
        assert_eq!(AxisRange::from_json(&json!(["2024-01-01", "2024-02-01"])), None);
        assert_eq!(AxisRange::from_json(&json!([1])), None);
        assert_eq!(AxisRange::parse(" -1, 4 "), Some(AxisRange::new(-1.0, 4.0)));
        assert_eq!(AxisRange::parse("1;4"), None);
    }
}
