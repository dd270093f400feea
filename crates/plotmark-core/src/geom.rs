#![forbid(unsafe_code)]

/// Axis units, as plotted by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSpace;

/// Pixels on the overlay surface, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSpace;

pub type DataPoint = euclid::Point2D<f64, DataSpace>;
pub type PixelPoint = euclid::Point2D<f64, PixelSpace>;
pub type PixelSize = euclid::Size2D<f64, PixelSpace>;

pub fn data_point(x: f64, y: f64) -> DataPoint {
    euclid::point2(x, y)
}

pub fn pixel_point(x: f64, y: f64) -> PixelPoint {
    euclid::point2(x, y)
}

pub fn pixel_size(width: f64, height: f64) -> PixelSize {
    euclid::size2(width, height)
}
