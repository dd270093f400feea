//! One invocation of the pipeline against a page.
//!
//! The order of effects is fixed: prompt, filter validation, chart lookup, trace read, surface
//! lookup, selection, markers, report. Everything that can reject the invocation (cancel,
//! invalid input, missing chart, unreadable chart data) runs before the page is touched, and
//! every fatal outcome is announced with exactly one notice.

use crate::{HeadlessError, HeadlessResult};
use plotmark_core::config::ElementLocator;
use plotmark_core::{Error, FilterSpec, PlotmarkConfig, PointSelector, Selection, Settings, Trace};
use plotmark_render::report::CONTAINER_STYLE;
use plotmark_render::{
    ChartView, MarkerStyle, MarkerSurface, OverlayManager, RedrawReport, ReportRenderer,
    ReportVariant, ViewChangeSource,
};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

pub const FILTER_PROMPT: &str = "Enter GitHub PR number (or leave blank for all):";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Write the report only.
    Extract,
    /// Write the report and mark every selected point on the chart.
    #[default]
    Annotate,
}

impl Mode {
    pub fn report_variant(self) -> ReportVariant {
        match self {
            Mode::Extract => ReportVariant::Extract,
            Mode::Annotate => ReportVariant::Annotate,
        }
    }

    pub fn draws_markers(self) -> bool {
        matches!(self, Mode::Annotate)
    }
}

/// User-facing messages, one per outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    FilterResolved(FilterSpec),
    Cancelled,
    InvalidFilter,
    ChartNotFound { class_name: String, index: usize },
    InvalidChartData,
    SurfaceNotFound { class_name: String, index: usize },
    NoMatches(FilterSpec),
    Completed { filter: String, container_id: String },
    Unexpected { message: String },
}

impl Notice {
    /// Whether this notice ends the invocation with an error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Notice::Cancelled
                | Notice::InvalidFilter
                | Notice::ChartNotFound { .. }
                | Notice::InvalidChartData
                | Notice::Unexpected { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::FilterResolved(FilterSpec::MatchAll) => {
                f.write_str("No URL filter applied. Showing all entries from processed traces.")
            }
            Notice::FilterResolved(filter) => write!(f, "Will filter for {filter}"),
            Notice::Cancelled => f.write_str("Operation cancelled by user."),
            Notice::InvalidFilter => f.write_str(
                "Invalid Pull Request number. Please enter a whole number for filtering, or leave blank for all.",
            ),
            Notice::ChartNotFound { class_name, index } => write!(
                f,
                "Plotly plot with class \"{class_name}\" (index {index}) not found on this page."
            ),
            Notice::InvalidChartData => f.write_str(
                "The identified Plotly graph div does not have a valid '.data' array property.",
            ),
            Notice::SurfaceNotFound { class_name, index } => write!(
                f,
                "Could not find the target SVG container (index {index}) with class \"{class_name}\". Circles will not be drawn."
            ),
            Notice::NoMatches(FilterSpec::MatchAll) => {
                f.write_str("No data found in any of the even-indexed traces to display.")
            }
            Notice::NoMatches(filter) => write!(
                f,
                "No entries found matching {filter} in the even-indexed traces."
            ),
            Notice::Completed {
                filter,
                container_id,
            } => write!(
                f,
                "Data extraction complete (Filter: {filter}). Appended to document (ID: '{container_id}')."
            ),
            Notice::Unexpected { message } => write!(f, "An error occurred: {message}"),
        }
    }
}

/// Chart data access needed for selection.
pub trait TraceSource {
    /// The chart's traces. Fails with [`Error::InvalidChartData`] when the chart has no data
    /// array.
    fn traces(&self) -> plotmark_core::Result<Vec<Trace>>;
}

/// The element the report is written into.
pub trait ReportContainer {
    /// Replaces the container's content.
    fn set_html(&self, html: &str) -> plotmark_render::Result<()>;

    /// Brings the container into view.
    fn reveal(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Created,
    Reused,
}

/// The host an invocation runs against.
pub trait Page {
    type Chart: TraceSource + ChartView + ViewChangeSource + 'static;
    type Surface: MarkerSurface + 'static;
    type Container: ReportContainer;

    /// Asks for the filter. `None` means the user dismissed the prompt.
    fn prompt(&self, message: &str, default: &str) -> Option<String>;

    fn notify(&self, notice: &Notice);

    fn find_chart(&self, locator: &ElementLocator) -> Option<Rc<Self::Chart>>;

    fn find_surface(&self, locator: &ElementLocator) -> Option<Rc<Self::Surface>>;

    /// The report container with `id`, created with `style` when the page has none yet.
    fn report_container(
        &self,
        id: &str,
        style: &str,
    ) -> plotmark_render::Result<(Rc<Self::Container>, ContainerState)>;
}

#[derive(Debug)]
pub struct Report<S> {
    pub selection: Rc<Selection>,
    pub html: String,
    pub container: ContainerState,
    /// Present when markers were drawn. The manager stays subscribed to the chart.
    pub overlay: Option<Rc<OverlayManager<S>>>,
    pub initial_redraw: Option<RedrawReport>,
}

#[derive(Debug)]
pub enum Outcome<S> {
    /// Nothing matched. The page was left untouched.
    NoMatches { filter: FilterSpec },
    Reported(Report<S>),
}

impl<S> Outcome<S> {
    pub fn report(&self) -> Option<&Report<S>> {
        match self {
            Outcome::Reported(report) => Some(report),
            Outcome::NoMatches { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    settings: Settings,
    mode: Mode,
}

impl Session {
    pub fn new(settings: Settings, mode: Mode) -> Self {
        Self { settings, mode }
    }

    pub fn from_config(config: &PlotmarkConfig, mode: Mode) -> HeadlessResult<Self> {
        Ok(Self::new(config.settings()?, mode))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn run<P: Page>(&self, page: &P) -> HeadlessResult<Outcome<P::Surface>> {
        let answer = page.prompt(FILTER_PROMPT, "");
        let filter =
            match FilterSpec::from_prompt(answer.as_deref(), &self.settings.filter.url_base) {
                Ok(filter) => filter,
                Err(err) => {
                    let notice = match &err {
                        Error::UserCancelled => Notice::Cancelled,
                        Error::InvalidFilterInput { .. } => Notice::InvalidFilter,
                        other => Notice::Unexpected {
                            message: other.to_string(),
                        },
                    };
                    return Err(fail(page, notice, err));
                }
            };
        tracing::info!(filter = %filter, "resolved filter");
        page.notify(&Notice::FilterResolved(filter.clone()));

        let locator = &self.settings.chart;
        let Some(chart) = page.find_chart(locator) else {
            let notice = Notice::ChartNotFound {
                class_name: locator.class_name.clone(),
                index: locator.index,
            };
            let err = Error::ChartNotFound {
                class_name: locator.class_name.clone(),
                index: locator.index,
            };
            return Err(fail(page, notice, err));
        };
        let traces = match chart.traces() {
            Ok(traces) => traces,
            Err(err) => return Err(fail(page, Notice::InvalidChartData, err)),
        };

        let surface = if self.mode.draws_markers() {
            let locator = &self.settings.surface;
            let surface = page.find_surface(locator);
            if surface.is_none() {
                tracing::warn!(
                    class_name = %locator.class_name,
                    index = locator.index,
                    "overlay surface not found; markers will not be drawn"
                );
                page.notify(&Notice::SurfaceNotFound {
                    class_name: locator.class_name.clone(),
                    index: locator.index,
                });
            }
            surface
        } else {
            None
        };

        self.report(page, &chart, surface, filter, &traces)
            .inspect_err(|err| {
                tracing::error!(error = %err, "invocation failed");
                page.notify(&Notice::Unexpected {
                    message: err.to_string(),
                });
            })
    }

    fn report<P: Page>(
        &self,
        page: &P,
        chart: &P::Chart,
        surface: Option<Rc<P::Surface>>,
        filter: FilterSpec,
        traces: &[Trace],
    ) -> HeadlessResult<Outcome<P::Surface>> {
        let selection = PointSelector::new(filter.clone(), self.settings.traces).select(traces);
        if selection.is_empty() {
            tracing::info!(filter = %filter, "no matching points");
            page.notify(&Notice::NoMatches(filter.clone()));
            return Ok(Outcome::NoMatches { filter });
        }
        let selection = Rc::new(selection);

        let (overlay, initial_redraw) = match surface {
            Some(surface) => {
                let manager = Rc::new(OverlayManager::new(
                    surface,
                    Rc::clone(&selection),
                    MarkerStyle::from(&self.settings.marker),
                ));
                let initial = OverlayManager::attach(&manager, chart);
                (Some(manager), Some(initial))
            }
            None => (None, None),
        };

        let html = ReportRenderer::new(self.mode.report_variant()).render_html(&selection);
        let container_id = &self.settings.report.container_id;
        let (container, state) = page.report_container(container_id, CONTAINER_STYLE)?;
        tracing::info!(id = %container_id, state = ?state, "writing report");
        container.set_html(&html)?;
        container.reveal();

        if self.mode == Mode::Extract {
            page.notify(&Notice::Completed {
                filter: selection.filter_description().to_string(),
                container_id: container_id.clone(),
            });
        } else {
            tracing::info!(
                id = %container_id,
                filter = %selection.filter_description(),
                "report written"
            );
        }

        Ok(Outcome::Reported(Report {
            selection,
            html,
            container: state,
            overlay,
            initial_redraw,
        }))
    }
}

fn fail<P: Page>(page: &P, notice: Notice, err: Error) -> HeadlessError {
    tracing::warn!(notice = %notice, "invocation rejected");
    page.notify(&notice);
    HeadlessError::Core(err)
}
