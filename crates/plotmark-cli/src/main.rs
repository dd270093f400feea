use plotmark::geom::pixel_size;
use plotmark::memory::{MemoryChart, MemoryPage};
use plotmark::render::raster::{RasterOptions, overlay_to_png};
use plotmark::render::{Marker, ReportRenderer, ReportSummary, SkippedMarker, SvgMarkerLayer};
use plotmark::session::{FILTER_PROMPT, Mode, Outcome, Session};
use plotmark::{AxisRange, HeadlessError, PlotmarkConfig};
use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Plotmark(HeadlessError),
    /// The pipeline refused the invocation and already said why.
    Rejected(HeadlessError),
    Raster(plotmark::render::raster::RasterError),
    Json(serde_json::Error),
    Config(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Plotmark(err) | CliError::Rejected(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Plotmark(err) | CliError::Rejected(err) => match err.core() {
                Some(plotmark::Error::ChartNotFound { .. }) => 3,
                Some(plotmark::Error::InvalidFilterInput { .. }) => 4,
                Some(plotmark::Error::UserCancelled) => 5,
                _ => 1,
            },
            _ => 1,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Plotmark(value)
    }
}

impl From<plotmark::render::raster::RasterError> for CliError {
    fn from(value: plotmark::render::raster::RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum OverlayFormat {
    #[default]
    Svg,
    Png,
}

impl FromStr for OverlayFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

/// One simulated pan/zoom: `x0,x1` optionally followed by `:y0,y1`.
#[derive(Debug, Clone, Copy)]
struct ViewChange {
    x: Option<AxisRange>,
    y: Option<AxisRange>,
}

impl FromStr for ViewChange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = match s.split_once(':') {
            Some((x, y)) => (x, Some(y)),
            None => (s, None),
        };
        let x = match x.trim() {
            "" => None,
            x => Some(AxisRange::parse(x).ok_or(())?),
        };
        let y = match y.map(str::trim) {
            None | Some("") => None,
            Some(y) => Some(AxisRange::parse(y).ok_or(())?),
        };
        if x.is_none() && y.is_none() {
            return Err(());
        }
        Ok(Self { x, y })
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    mode: Mode,
    pr: Option<String>,
    config: Option<String>,
    overrides: Vec<(String, Value)>,
    x_range: Option<AxisRange>,
    y_range: Option<AxisRange>,
    surface_width: f64,
    surface_height: f64,
    view_changes: Vec<ViewChange>,
    format: ReportFormat,
    out: Option<String>,
    overlay: Option<String>,
    overlay_format: OverlayFormat,
    scale: f32,
    background: Option<String>,
    verbose: bool,
}

#[derive(Serialize)]
struct JsonOut<'a> {
    report: Option<ReportSummary>,
    markers: Vec<Marker>,
    skipped_markers: &'a [SkippedMarker],
    notices: Vec<String>,
}

fn usage() -> &'static str {
    "plotmark-cli\n\
\n\
USAGE:\n\
  plotmark-cli [--mode annotate|extract] [--pr <number>|--all] [--config <path>] [--set <key>=<value>]... [--x-range <min,max>] [--y-range <min,max>] [--surface-width <w>] [--surface-height <h>] [--view-change <x0,x1[:y0,y1]>]... [--format html|json] [--out <path>] [--overlay <path>] [--overlay-format svg|png] [--scale <n>] [--background <css-color>] [--verbose] [<snapshot.json>|-]\n\
\n\
NOTES:\n\
  - The snapshot is a Plotly figure: { \"data\": [...], \"layout\": {...}, \"_fullData\": [...] }.\n\
  - If <snapshot.json> is omitted or '-', the snapshot is read from stdin and --pr or --all is required.\n\
  - Without --pr/--all the pull request number is prompted for on stdin; an empty line selects all entries.\n\
  - The report is printed to stdout by default; use --out to write a file.\n\
  - --config accepts JSON5, or YAML when the file ends in .yaml/.yml.\n\
  - PLOTMARK_LOG sets the log filter (default: warn).\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        surface_width: 800.0,
        surface_height: 600.0,
        scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--verbose" | "-v" => args.verbose = true,
            "--mode" => {
                args.mode = match next_value(&mut it)?.as_str() {
                    "annotate" => Mode::Annotate,
                    "extract" => Mode::Extract,
                    _ => return Err(CliError::Usage(usage())),
                };
            }
            "--pr" => args.pr = Some(next_value(&mut it)?.clone()),
            "--all" => args.pr = Some(String::new()),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--set" => {
                let raw = next_value(&mut it)?;
                let Some((key, value)) = raw.split_once('=') else {
                    return Err(CliError::Usage(usage()));
                };
                let value = serde_json::from_str::<Value>(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                args.overrides.push((key.trim().to_string(), value));
            }
            "--x-range" => {
                let raw = next_value(&mut it)?;
                args.x_range = Some(AxisRange::parse(raw).ok_or(CliError::Usage(usage()))?);
            }
            "--y-range" => {
                let raw = next_value(&mut it)?;
                args.y_range = Some(AxisRange::parse(raw).ok_or(CliError::Usage(usage()))?);
            }
            "--surface-width" => {
                args.surface_width = parse_dimension(next_value(&mut it)?)?;
            }
            "--surface-height" => {
                args.surface_height = parse_dimension(next_value(&mut it)?)?;
            }
            "--view-change" => {
                let change = next_value(&mut it)?
                    .parse::<ViewChange>()
                    .map_err(|_| CliError::Usage(usage()))?;
                args.view_changes.push(change);
            }
            "--format" => {
                args.format = next_value(&mut it)?
                    .parse::<ReportFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--overlay" => args.overlay = Some(next_value(&mut it)?.clone()),
            "--overlay-format" => {
                args.overlay_format = next_value(&mut it)?
                    .parse::<OverlayFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                args.scale = next_value(&mut it)?
                    .parse::<f32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(args.scale.is_finite() && args.scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--background" => {
                let bg = next_value(&mut it)?;
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    let reads_stdin = matches!(args.input.as_deref(), None | Some("-"));
    if reads_stdin && args.pr.is_none() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn parse_dimension(raw: &str) -> Result<f64, CliError> {
    let v = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(CliError::Usage(usage()))
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(args: &Args) -> Result<PlotmarkConfig, CliError> {
    let mut config = PlotmarkConfig::default();
    if let Some(path) = args.config.as_deref() {
        let text = std::fs::read_to_string(path)?;
        let is_yaml = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml"));
        let value: Value = if is_yaml {
            serde_yaml::from_str(&text).map_err(|err| CliError::Config(err.to_string()))?
        } else {
            json5::from_str(&text).map_err(|err| CliError::Config(err.to_string()))?
        };
        if !value.is_object() {
            return Err(CliError::Config(format!(
                "{path}: expected a mapping at the top level"
            )));
        }
        config.deep_merge(&value);
    }
    for (key, value) in &args.overrides {
        config.set_value(key, value.clone());
    }
    Ok(config)
}

/// Reads the prompt answer from stdin. EOF dismisses the prompt.
fn prompt_stdin() -> Result<Option<String>, CliError> {
    eprint!("{FILTER_PROMPT} ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_overlay(layer: &SvgMarkerLayer, args: &Args, path: &str) -> Result<(), CliError> {
    match args.overlay_format {
        OverlayFormat::Svg => std::fs::write(path, layer.to_svg_document())?,
        OverlayFormat::Png => {
            let options = RasterOptions {
                scale: args.scale,
                background: args.background.clone(),
            };
            std::fs::write(path, overlay_to_png(layer, &options)?)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = match std::env::var("PLOTMARK_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ if verbose => {
            EnvFilter::new("warn,plotmark=debug,plotmark_core=debug,plotmark_render=debug")
        }
        _ => EnvFilter::new("warn"),
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter)
        .try_init();
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let session = Session::from_config(&config, args.mode)?;

    // A malformed figure is only reported once the session reads its traces.
    let chart = MemoryChart::from_json_str(&read_input(args.input.as_deref())?);
    if args.x_range.is_some() || args.y_range.is_some() {
        chart.set_ranges(args.x_range, args.y_range);
    }
    tracing::debug!(
        loaded = chart.snapshot().is_some(),
        mode = ?args.mode,
        "read chart figure"
    );

    let answer = match args.pr.as_deref() {
        Some(pr) => Some(pr.to_string()),
        None => prompt_stdin()?,
    };
    let page = MemoryPage::plotly(chart, pixel_size(args.surface_width, args.surface_height))
        .with_answer(answer.as_deref());

    let result = session.run(&page);
    for notice in page.notices() {
        eprintln!("{notice}");
    }
    let outcome = result.map_err(CliError::Rejected)?;

    let settings = session.settings();
    let layer = page.surface(&settings.surface.class_name, settings.surface.index);
    let mut skipped = Vec::new();
    if let (Outcome::Reported(report), Some(chart)) = (
        &outcome,
        page.chart(&settings.chart.class_name, settings.chart.index),
    ) {
        for change in &args.view_changes {
            chart.relayout(change.x, change.y);
        }
        if let Some(overlay) = &report.overlay {
            // Subscribed redraws already ran after each change; this pass reports the final state.
            skipped = overlay.redraw(&*chart).skipped;
        }
    }

    if let (Some(path), Some(layer)) = (args.overlay.as_deref(), layer.as_ref()) {
        write_overlay(layer, &args, path)?;
    }

    match (&outcome, args.format) {
        (Outcome::Reported(report), ReportFormat::Html) => {
            let container_id = &session.settings().report.container_id;
            let Some(container) = page.container(container_id) else {
                return Ok(());
            };
            let title = session
                .mode()
                .report_variant()
                .title(report.selection.filter_description());
            write_text(&container.to_html_document(&title), args.out.as_deref())?;
        }
        (Outcome::NoMatches { .. }, ReportFormat::Html) => {}
        (_, ReportFormat::Json) => {
            let renderer = ReportRenderer::new(session.mode().report_variant());
            let summary = outcome
                .report()
                .map(|report| renderer.summary(&report.selection));
            let out = JsonOut {
                report: summary,
                markers: layer.map(|l| l.markers()).unwrap_or_default(),
                skipped_markers: &skipped,
                notices: page.notices().iter().map(ToString::to_string).collect(),
            };
            let mut text = serde_json::to_string_pretty(&out)?;
            text.push('\n');
            write_text(&text, args.out.as_deref())?;
        }
    }
    Ok(())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    };
    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        if !matches!(err, CliError::Rejected(_)) {
            eprintln!("{err}");
        }
        std::process::exit(err.exit_code());
    }
}
