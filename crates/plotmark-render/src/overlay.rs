//! Marker overlay maintenance.
//!
//! The overlay owns no markers of its own between redraws. Every redraw removes all elements
//! tagged with the marker class, reads the chart's current axis ranges and the surface's
//! current size, and appends one marker per selected point that can still be projected.

use crate::Result;
use crate::marker::{Marker, MarkerStyle};
use plotmark_core::geom::PixelSize;
use plotmark_core::{
    AxisRange, ChartSnapshot, ProjectionError, ResolvedPoint, SelectedPoint, Selection,
    ViewportState,
};
use serde::Serialize;
use std::rc::Rc;

/// Read access to the live chart a selection was taken from.
pub trait ChartView {
    /// Current `(x, y)` axis ranges. Either may be unavailable.
    fn axis_ranges(&self) -> (Option<AxisRange>, Option<AxisRange>);

    /// The rendered coordinate of one point.
    fn resolved_point(&self, trace_index: usize, point_index: usize) -> ResolvedPoint;
}

impl ChartView for ChartSnapshot {
    fn axis_ranges(&self) -> (Option<AxisRange>, Option<AxisRange>) {
        (self.x_range(), self.y_range())
    }

    fn resolved_point(&self, trace_index: usize, point_index: usize) -> ResolvedPoint {
        ChartSnapshot::resolved_point(self, trace_index, point_index)
    }
}

/// The drawing layer markers are appended to.
pub trait MarkerSurface {
    fn bounding_box(&self) -> PixelSize;

    /// Removes every element tagged with `class_name` and returns how many were removed.
    fn remove_markers(&self, class_name: &str) -> usize;

    fn append_marker(&self, marker: &Marker) -> Result<()>;
}

pub type ViewChangeHandler<C> = Box<dyn FnMut(&C)>;

/// Pan/zoom/resize notifications.
pub trait ViewChangeSource: Sized {
    /// Installs `handler` under `key`, dropping any handler previously installed under the
    /// same key. Handlers receive the chart that changed.
    fn replace_view_change_handler(&self, key: &str, handler: ViewChangeHandler<Self>);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerFailure {
    Projection { message: String },
    Surface { message: String },
}

impl From<ProjectionError> for MarkerFailure {
    fn from(err: ProjectionError) -> Self {
        MarkerFailure::Projection {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedMarker {
    pub trace_index: usize,
    pub point_index: usize,
    pub failure: MarkerFailure,
}

/// What one redraw did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RedrawReport {
    pub removed: usize,
    pub drawn: Vec<Marker>,
    pub skipped: Vec<SkippedMarker>,
}

#[derive(Debug)]
pub struct OverlayManager<S> {
    surface: Rc<S>,
    selection: Rc<Selection>,
    style: MarkerStyle,
}

impl<S: MarkerSurface> OverlayManager<S> {
    pub fn new(surface: Rc<S>, selection: Rc<Selection>, style: MarkerStyle) -> Self {
        Self {
            surface,
            selection,
            style,
        }
    }

    pub fn surface(&self) -> &Rc<S> {
        &self.surface
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    /// Clears and redraws every marker against the chart's current view.
    pub fn redraw<C: ChartView + ?Sized>(&self, chart: &C) -> RedrawReport {
        let mut report = RedrawReport {
            removed: self.surface.remove_markers(&self.style.class_name),
            ..RedrawReport::default()
        };

        let (x_range, y_range) = chart.axis_ranges();
        let viewport = ViewportState::capture(x_range, y_range, self.surface.bounding_box());

        for point in self.selection.points() {
            match self.draw_point(chart, viewport, point) {
                Ok(marker) => report.drawn.push(marker),
                Err(failure) => {
                    tracing::warn!(
                        trace_index = point.trace_index,
                        point_index = point.point_index,
                        ?failure,
                        "failed to draw marker"
                    );
                    report.skipped.push(SkippedMarker {
                        trace_index: point.trace_index,
                        point_index: point.point_index,
                        failure,
                    });
                }
            }
        }

        tracing::info!(
            removed = report.removed,
            drawn = report.drawn.len(),
            skipped = report.skipped.len(),
            "redrew overlay markers"
        );
        report
    }

    fn draw_point<C: ChartView + ?Sized>(
        &self,
        chart: &C,
        viewport: std::result::Result<ViewportState, ProjectionError>,
        point: &SelectedPoint,
    ) -> std::result::Result<Marker, MarkerFailure> {
        let viewport = viewport?;
        let resolved = chart.resolved_point(point.trace_index, point.point_index);
        let center = viewport.project(resolved)?;
        let marker = self
            .style
            .marker_at(center, point.trace_index, point.point_index);
        self.surface
            .append_marker(&marker)
            .map_err(|err| MarkerFailure::Surface {
                message: err.to_string(),
            })?;
        Ok(marker)
    }
}

impl<S: MarkerSurface + 'static> OverlayManager<S> {
    /// Draws the markers once and subscribes them to the chart's view changes.
    ///
    /// The subscription is keyed on the marker class, so attaching again (from this or a later
    /// invocation) replaces the earlier handler instead of stacking a second one.
    pub fn attach<C>(manager: &Rc<Self>, chart: &C) -> RedrawReport
    where
        C: ChartView + ViewChangeSource + 'static,
    {
        let report = manager.redraw(chart);
        let subscribed = Rc::clone(manager);
        chart.replace_view_change_handler(
            &manager.style.class_name,
            Box::new(move |chart: &C| {
                subscribed.redraw(chart);
            }),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::SvgMarkerLayer;
    use plotmark_core::geom::{pixel_point, pixel_size};
    use plotmark_core::{FilterSpec, Trace, TraceStride, select_points};
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    struct StubChart {
        ranges: Cell<(Option<AxisRange>, Option<AxisRange>)>,
        points: Vec<ResolvedPoint>,
        handler: RefCell<Option<ViewChangeHandler<StubChart>>>,
        installs: Cell<usize>,
    }

    impl StubChart {
        fn new(points: Vec<ResolvedPoint>) -> Self {
            Self {
                ranges: Cell::new((
                    Some(AxisRange::new(0.0, 10.0)),
                    Some(AxisRange::new(0.0, 10.0)),
                )),
                points,
                handler: RefCell::new(None),
                installs: Cell::new(0),
            }
        }

        fn relayout(&self, x: AxisRange) {
            let (_, y) = self.ranges.get();
            self.ranges.set((Some(x), y));
            let handler = self.handler.borrow_mut().take();
            if let Some(mut handler) = handler {
                handler(self);
                let mut slot = self.handler.borrow_mut();
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }
        }
    }

    impl ChartView for StubChart {
        fn axis_ranges(&self) -> (Option<AxisRange>, Option<AxisRange>) {
            self.ranges.get()
        }

        fn resolved_point(&self, _trace_index: usize, point_index: usize) -> ResolvedPoint {
            self.points.get(point_index).copied().unwrap_or_default()
        }
    }

    impl ViewChangeSource for StubChart {
        fn replace_view_change_handler(&self, _key: &str, handler: ViewChangeHandler<Self>) {
            self.installs.set(self.installs.get() + 1);
            *self.handler.borrow_mut() = Some(handler);
        }
    }

    fn selection(n: usize) -> Rc<Selection> {
        let xs: Vec<usize> = (0..n).collect();
        let trace = Trace::from_json(&json!({ "x": xs }));
        Rc::new(select_points(&[trace], &FilterSpec::MatchAll, TraceStride::PAIRED))
    }

    fn style() -> MarkerStyle {
        MarkerStyle {
            class_name: "dynamic-indicator-circle".to_string(),
            radius: 8.0,
            fill: "orange".to_string(),
            stroke: "black".to_string(),
            stroke_width: 2.0,
        }
    }

    #[test]
    fn redraw_projects_every_point() {
        let chart = StubChart::new(vec![
            ResolvedPoint::new(5.0, 5.0),
            ResolvedPoint::new(0.0, 10.0),
        ]);
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(100.0, 50.0)));
        let manager = OverlayManager::new(Rc::clone(&layer), selection(2), style());
        let report = manager.redraw(&chart);
        assert_eq!(report.removed, 0);
        assert_eq!(report.drawn.len(), 2);
        assert_eq!(report.drawn[0].center, pixel_point(50.0, 25.0));
        assert_eq!(report.drawn[1].center, pixel_point(0.0, 0.0));
        assert_eq!(layer.markers().len(), 2);
    }

    #[test]
    fn failing_points_do_not_block_the_rest() {
        let chart = StubChart::new(vec![
            ResolvedPoint { x: None, y: Some(1.0) },
            ResolvedPoint::new(2.0, 2.0),
        ]);
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(10.0, 10.0)));
        let report = OverlayManager::new(Rc::clone(&layer), selection(2), style()).redraw(&chart);
        assert_eq!(report.drawn.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].point_index, 0);
        assert!(matches!(report.skipped[0].failure, MarkerFailure::Projection { .. }));
    }

    #[test]
    fn overflowing_projection_is_skipped_not_drawn_at_origin() {
        let chart = StubChart::new(vec![
            ResolvedPoint::new(1e308, 5.0),
            ResolvedPoint::new(0.0, 5.0),
        ]);
        chart.ranges.set((
            Some(AxisRange::new(-1e308, 1e308)),
            Some(AxisRange::new(0.0, 10.0)),
        ));
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(100.0, 100.0)));
        let report = OverlayManager::new(Rc::clone(&layer), selection(2), style()).redraw(&chart);
        assert_eq!(report.drawn.len(), 1);
        assert_eq!(report.drawn[0].point_index, 1);
        assert_eq!(
            report.skipped[0].failure,
            MarkerFailure::from(ProjectionError::NonFinitePixel {
                axis: plotmark_core::Axis::X
            })
        );
        assert_eq!(layer.markers().len(), 1);
    }

    #[test]
    fn missing_range_skips_the_whole_redraw() {
        let chart = StubChart::new(vec![ResolvedPoint::new(1.0, 1.0)]);
        chart.ranges.set((None, Some(AxisRange::new(0.0, 1.0))));
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(10.0, 10.0)));
        let report = OverlayManager::new(Rc::clone(&layer), selection(1), style()).redraw(&chart);
        assert!(report.drawn.is_empty());
        assert_eq!(
            report.skipped[0].failure,
            MarkerFailure::from(ProjectionError::MissingRange {
                axis: plotmark_core::Axis::X
            })
        );
    }

    #[test]
    fn view_change_replaces_markers_at_new_positions() {
        let chart = StubChart::new(vec![ResolvedPoint::new(5.0, 5.0)]);
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(100.0, 100.0)));
        let manager = Rc::new(OverlayManager::new(Rc::clone(&layer), selection(1), style()));
        let first = OverlayManager::attach(&manager, &chart);
        assert_eq!(first.drawn[0].center, pixel_point(50.0, 50.0));

        chart.relayout(AxisRange::new(5.0, 15.0));
        let markers = layer.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].center, pixel_point(0.0, 50.0));
    }

    #[test]
    fn attaching_twice_keeps_a_single_marker_set() {
        let chart = StubChart::new(vec![ResolvedPoint::new(1.0, 1.0)]);
        let layer = Rc::new(SvgMarkerLayer::new(pixel_size(10.0, 10.0)));
        let manager = Rc::new(OverlayManager::new(Rc::clone(&layer), selection(1), style()));
        OverlayManager::attach(&manager, &chart);
        let second = OverlayManager::attach(&manager, &chart);
        assert_eq!(second.removed, 1);
        assert_eq!(layer.markers().len(), 1);
        assert_eq!(chart.installs.get(), 2);

        chart.relayout(AxisRange::new(0.0, 20.0));
        assert_eq!(layer.markers().len(), 1);
    }
}
