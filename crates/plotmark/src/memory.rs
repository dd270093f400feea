//! A headless page: charts, overlay layers and report containers held in memory.
//!
//! [`MemoryPage::plotly`] lays elements out the way a Plotly page does: one chart element and
//! three stacked `main-svg` layers, the last of which sits on top.

use crate::session::{ContainerState, Notice, Page, ReportContainer, TraceSource};
use indexmap::IndexMap;
use plotmark_core::config::ElementLocator;
use plotmark_core::geom::PixelSize;
use plotmark_core::{AxisRange, ChartSnapshot, Error, ResolvedPoint, Trace};
use plotmark_render::{ChartView, SvgMarkerLayer, ViewChangeHandler, ViewChangeSource};
use serde_json::Value;
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const PLOTLY_CHART_CLASS: &str = "js-plotly-plot";
pub const PLOTLY_LAYER_CLASS: &str = "main-svg";
const PLOTLY_LAYER_COUNT: usize = 3;

/// What the chart element holds as its figure. A figure without a usable `data` array is kept
/// as-is so the failure surfaces when the traces are read, as it would on a live page.
#[derive(Debug, Clone, PartialEq)]
enum Figure {
    Loaded(ChartSnapshot),
    Invalid { message: String },
}

/// A chart element with its figure and its `plotly_relayout` subscribers.
pub struct MemoryChart {
    figure: RefCell<Figure>,
    handlers: RefCell<IndexMap<String, ViewChangeHandler<MemoryChart>>>,
}

impl std::fmt::Debug for MemoryChart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChart")
            .field("figure", &self.figure)
            .field("handlers", &self.handlers.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryChart {
    pub fn new(snapshot: ChartSnapshot) -> Self {
        Self::with_figure(Figure::Loaded(snapshot))
    }

    /// Loads a serialized figure. Malformed figures are accepted here and reported by
    /// [`TraceSource::traces`].
    pub fn from_value(value: Value) -> Self {
        Self::with_figure(match ChartSnapshot::from_value(value) {
            Ok(snapshot) => Figure::Loaded(snapshot),
            Err(Error::InvalidChartData { message }) => Figure::Invalid { message },
            Err(err) => Figure::Invalid {
                message: err.to_string(),
            },
        })
    }

    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::with_figure(Figure::Invalid {
                message: err.to_string(),
            }),
        }
    }

    fn with_figure(figure: Figure) -> Self {
        Self {
            figure: RefCell::new(figure),
            handlers: RefCell::new(IndexMap::new()),
        }
    }

    /// The figure, unless it has no usable `data` array.
    pub fn snapshot(&self) -> Option<Ref<'_, ChartSnapshot>> {
        Ref::filter_map(self.figure.borrow(), |figure| match figure {
            Figure::Loaded(snapshot) => Some(snapshot),
            Figure::Invalid { .. } => None,
        })
        .ok()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Replaces the axis ranges without notifying subscribers.
    pub fn set_ranges(&self, x: Option<AxisRange>, y: Option<AxisRange>) {
        if let Figure::Loaded(snapshot) = &mut *self.figure.borrow_mut() {
            snapshot.set_ranges(x, y);
        }
    }

    /// Applies a pan or zoom and notifies every subscriber. Returns how many were notified.
    pub fn relayout(&self, x: Option<AxisRange>, y: Option<AxisRange>) -> usize {
        self.set_ranges(x, y);
        self.notify_view_change()
    }

    /// Notifies subscribers without changing the figure, as a window resize would.
    pub fn notify_view_change(&self) -> usize {
        let mut handlers = std::mem::take(&mut *self.handlers.borrow_mut());
        for handler in handlers.values_mut() {
            handler(self);
        }
        let fired = handlers.len();
        // Handlers installed while firing win over the ones that just ran.
        let mut installed = self.handlers.borrow_mut();
        for (key, handler) in handlers {
            installed.entry(key).or_insert(handler);
        }
        fired
    }
}

impl TraceSource for MemoryChart {
    fn traces(&self) -> plotmark_core::Result<Vec<Trace>> {
        match &*self.figure.borrow() {
            Figure::Loaded(snapshot) => Ok(snapshot.traces().to_vec()),
            Figure::Invalid { message } => Err(Error::InvalidChartData {
                message: message.clone(),
            }),
        }
    }
}

impl ChartView for MemoryChart {
    fn axis_ranges(&self) -> (Option<AxisRange>, Option<AxisRange>) {
        self.snapshot()
            .map_or((None, None), |snapshot| snapshot.axis_ranges())
    }

    fn resolved_point(&self, trace_index: usize, point_index: usize) -> ResolvedPoint {
        self.snapshot()
            .map(|snapshot| snapshot.resolved_point(trace_index, point_index))
            .unwrap_or_default()
    }
}

impl ViewChangeSource for MemoryChart {
    fn replace_view_change_handler(&self, key: &str, handler: ViewChangeHandler<Self>) {
        let replaced = self
            .handlers
            .borrow_mut()
            .insert(key.to_string(), handler)
            .is_some();
        tracing::debug!(key, replaced, "installed view change handler");
    }
}

#[derive(Debug)]
pub struct MemoryContainer {
    id: String,
    style: String,
    html: RefCell<String>,
    reveals: Cell<usize>,
}

impl MemoryContainer {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn html(&self) -> String {
        self.html.borrow().clone()
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.get()
    }

    /// A standalone document holding this container, for writing the report to disk.
    pub fn to_html_document(&self, title: &str) -> String {
        format!(
            concat!(
                "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n",
                "<title>{title}</title>\n</head>\n<body>\n",
                "<div id=\"{id}\" style=\"{style}\">{html}</div>\n</body>\n</html>\n"
            ),
            title = htmlize::escape_text(title),
            id = htmlize::escape_attribute(&self.id),
            style = htmlize::escape_attribute(&self.style),
            html = self.html.borrow(),
        )
    }
}

impl ReportContainer for MemoryContainer {
    fn set_html(&self, html: &str) -> plotmark_render::Result<()> {
        *self.html.borrow_mut() = html.to_string();
        Ok(())
    }

    fn reveal(&self) {
        self.reveals.set(self.reveals.get() + 1);
    }
}

/// A page whose prompt answers are queued up front and whose notices are recorded.
#[derive(Debug, Default)]
pub struct MemoryPage {
    answers: RefCell<VecDeque<Option<String>>>,
    prompts: RefCell<Vec<String>>,
    notices: RefCell<Vec<Notice>>,
    charts: Vec<(String, Rc<MemoryChart>)>,
    surfaces: Vec<(String, Rc<SvgMarkerLayer>)>,
    containers: RefCell<IndexMap<String, Rc<MemoryContainer>>>,
    /// Ids taken by elements that cannot hold a report (an `<svg>`, say).
    foreign_ids: Vec<String>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// One Plotly chart with its three `main-svg` layers, all `size` pixels.
    pub fn plotly(chart: MemoryChart, size: PixelSize) -> Self {
        let mut page = Self::new().with_chart(PLOTLY_CHART_CLASS, chart);
        for _ in 0..PLOTLY_LAYER_COUNT {
            page = page.with_surface(PLOTLY_LAYER_CLASS, SvgMarkerLayer::new(size));
        }
        page
    }

    pub fn with_chart(mut self, class_name: &str, chart: MemoryChart) -> Self {
        self.charts.push((class_name.to_string(), Rc::new(chart)));
        self
    }

    /// Marks `id` as taken by an element that cannot hold a report.
    pub fn with_foreign_element(mut self, id: &str) -> Self {
        self.foreign_ids.push(id.to_string());
        self
    }

    pub fn with_surface(mut self, class_name: &str, layer: SvgMarkerLayer) -> Self {
        self.surfaces.push((class_name.to_string(), Rc::new(layer)));
        self
    }

    /// Queues the answer for the next prompt. `None` dismisses it.
    pub fn push_answer(&self, answer: Option<&str>) {
        self.answers
            .borrow_mut()
            .push_back(answer.map(str::to_string));
    }

    pub fn with_answer(self, answer: Option<&str>) -> Self {
        self.push_answer(answer);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn chart(&self, class_name: &str, index: usize) -> Option<Rc<MemoryChart>> {
        find(&self.charts, class_name, index)
    }

    pub fn surface(&self, class_name: &str, index: usize) -> Option<Rc<SvgMarkerLayer>> {
        find(&self.surfaces, class_name, index)
    }

    pub fn container(&self, id: &str) -> Option<Rc<MemoryContainer>> {
        self.containers.borrow().get(id).cloned()
    }

    pub fn container_count(&self) -> usize {
        self.containers.borrow().len()
    }
}

fn find<T>(elements: &[(String, Rc<T>)], class_name: &str, index: usize) -> Option<Rc<T>> {
    elements
        .iter()
        .filter(|(class, _)| class == class_name)
        .nth(index)
        .map(|(_, element)| Rc::clone(element))
}

impl Page for MemoryPage {
    type Chart = MemoryChart;
    type Surface = SvgMarkerLayer;
    type Container = MemoryContainer;

    fn prompt(&self, message: &str, _default: &str) -> Option<String> {
        self.prompts.borrow_mut().push(message.to_string());
        self.answers.borrow_mut().pop_front().flatten()
    }

    fn notify(&self, notice: &Notice) {
        tracing::info!(notice = %notice, "notice");
        self.notices.borrow_mut().push(notice.clone());
    }

    fn find_chart(&self, locator: &ElementLocator) -> Option<Rc<MemoryChart>> {
        self.chart(&locator.class_name, locator.index)
    }

    fn find_surface(&self, locator: &ElementLocator) -> Option<Rc<SvgMarkerLayer>> {
        self.surface(&locator.class_name, locator.index)
    }

    fn report_container(
        &self,
        id: &str,
        style: &str,
    ) -> plotmark_render::Result<(Rc<MemoryContainer>, ContainerState)> {
        if self.foreign_ids.iter().any(|taken| taken == id) {
            return Err(plotmark_render::Error::Container {
                message: format!("element #{id} is not an HTML element"),
            });
        }
        let mut containers = self.containers.borrow_mut();
        if let Some(existing) = containers.get(id) {
            return Ok((Rc::clone(existing), ContainerState::Reused));
        }
        let container = Rc::new(MemoryContainer {
            id: id.to_string(),
            style: style.to_string(),
            html: RefCell::new(String::new()),
            reveals: Cell::new(0),
        });
        containers.insert(id.to_string(), Rc::clone(&container));
        Ok((container, ContainerState::Created))
    }
}
