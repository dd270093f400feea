//! Browser entry points for plotmark.
//!
//! Both functions prompt for a pull request number, filter the points of the first Plotly chart
//! on the page and write the report into a container appended to `<body>`. `revealPoints` also
//! circles every selected point and keeps the circles in place while the chart is panned or
//! zoomed.
//!
//! ```js
//! import init, { revealPoints } from "./plotmark_web.js";
//! await init();
//! revealPoints({ marker: { radius: 10 } });
//! ```

mod dom;

pub use dom::{WebChart, WebContainer, WebPage, WebSurface};

use plotmark::render::ReportRenderer;
use plotmark::session::{Mode, Outcome, Session};
use plotmark::{HeadlessError, PlotmarkConfig};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn config_from_js(config: JsValue) -> Result<PlotmarkConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(PlotmarkConfig::default());
    }
    let value: serde_json::Value = serde_wasm_bindgen::from_value(config)?;
    Ok(PlotmarkConfig::from_value(value))
}

fn to_js_error(err: HeadlessError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn run(mode: Mode, config: JsValue) -> Result<JsValue, JsValue> {
    let config = config_from_js(config)?;
    let session = Session::from_config(&config, mode).map_err(to_js_error)?;
    let page = WebPage::current()?;

    let outcome = session.run(&page).map_err(|err| {
        web_sys::console::error_1(&JsValue::from_str(&format!(
            "Error during plotmark execution: {err}"
        )));
        to_js_error(err)
    })?;
    let Outcome::Reported(report) = outcome else {
        return Ok(JsValue::NULL);
    };
    if let Some(initial) = &report.initial_redraw {
        tracing::info!(
            drawn = initial.drawn.len(),
            skipped = initial.skipped.len(),
            "markers drawn"
        );
    }

    let summary = ReportRenderer::new(mode.report_variant()).summary(&report.selection);
    Ok(summary.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// Writes the report and circles the selected points. Resolves to the report summary, or
/// `null` when nothing matched.
#[wasm_bindgen(js_name = revealPoints)]
pub fn reveal_points(config: JsValue) -> Result<JsValue, JsValue> {
    run(Mode::Annotate, config)
}

/// Writes the report only.
#[wasm_bindgen(js_name = extractPoints)]
pub fn extract_points(config: JsValue) -> Result<JsValue, JsValue> {
    run(Mode::Extract, config)
}
