//! [`Page`] implementation over the browser DOM and a Plotly graph div.

use plotmark::config::ElementLocator;
use plotmark::geom::{PixelSize, pixel_size};
use plotmark::render::{ChartView, Marker, MarkerSurface, ViewChangeHandler, ViewChangeSource};
use plotmark::session::{ContainerState, Notice, Page, ReportContainer, TraceSource};
use plotmark::{AxisRange, Error, ResolvedPoint, Trace};
use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, Window};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const RELAYOUT_EVENT: &str = "plotly_relayout";
/// Property on the graph div holding the listeners installed by this crate, keyed by name.
const HANDLERS_PROPERTY: &str = "__plotmarkViewHandlers";

fn prop(target: &JsValue, key: &str) -> Option<JsValue> {
    let value = js_sys::Reflect::get(target, &JsValue::from_str(key)).ok()?;
    (!value.is_undefined() && !value.is_null()).then_some(value)
}

fn method(target: &JsValue, name: &str) -> Option<js_sys::Function> {
    prop(target, name)?.dyn_into::<js_sys::Function>().ok()
}

pub(crate) fn js_message(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| prop(err, "message").and_then(|m| m.as_string()))
        .unwrap_or_else(|| format!("{err:?}"))
}

fn to_json(value: &JsValue) -> Option<Value> {
    serde_wasm_bindgen::from_value(value.clone()).ok()
}

/// A Plotly graph div (`gd`).
#[derive(Debug, Clone)]
pub struct WebChart {
    element: Element,
}

impl WebChart {
    fn axis_range(&self, axis: &str) -> Option<AxisRange> {
        let layout = prop(&self.element, "layout")?;
        let range = prop(&prop(&layout, axis)?, "range")?;
        AxisRange::from_json(&to_json(&range)?)
    }

    fn handlers(&self) -> Option<js_sys::Object> {
        if let Some(existing) = prop(&self.element, HANDLERS_PROPERTY) {
            return existing.dyn_into::<js_sys::Object>().ok();
        }
        let created = js_sys::Object::new();
        js_sys::Reflect::set(&self.element, &JsValue::from_str(HANDLERS_PROPERTY), &created)
            .ok()?;
        Some(created)
    }
}

impl TraceSource for WebChart {
    fn traces(&self) -> plotmark::Result<Vec<Trace>> {
        let data = prop(&self.element, "data")
            .filter(js_sys::Array::is_array)
            .ok_or_else(|| Error::InvalidChartData {
                message: "the graph div has no 'data' array".to_string(),
            })?;
        let data: Vec<Value> =
            serde_wasm_bindgen::from_value(data).map_err(|err| Error::InvalidChartData {
                message: err.to_string(),
            })?;
        Ok(data.iter().map(Trace::from_json).collect())
    }
}

impl ChartView for WebChart {
    fn axis_ranges(&self) -> (Option<AxisRange>, Option<AxisRange>) {
        (self.axis_range("xaxis"), self.axis_range("yaxis"))
    }

    fn resolved_point(&self, trace_index: usize, point_index: usize) -> ResolvedPoint {
        let rendered = prop(&self.element, "_fullData")
            .filter(js_sys::Array::is_array)
            .or_else(|| prop(&self.element, "data"));
        let Some(trace) = rendered.and_then(|traces| {
            let trace = js_sys::Reflect::get_u32(&traces, trace_index as u32).ok()?;
            (!trace.is_undefined()).then_some(trace)
        }) else {
            return ResolvedPoint::default();
        };
        let component = |key: &str| {
            let values = prop(&trace, key)?;
            js_sys::Reflect::get_u32(&values, point_index as u32)
                .ok()?
                .as_f64()
                .filter(|v| v.is_finite())
        };
        ResolvedPoint {
            x: component("x"),
            y: component("y"),
        }
    }
}

impl ViewChangeSource for WebChart {
    fn replace_view_change_handler(&self, key: &str, mut handler: ViewChangeHandler<Self>) {
        let Some(handlers) = self.handlers() else {
            tracing::warn!(key, "cannot record view change handlers on the graph div");
            return;
        };
        let key_js = JsValue::from_str(key);
        let event = JsValue::from_str(RELAYOUT_EVENT);

        if let Some(previous) = prop(&handlers, key) {
            if let Some(remove) = method(&self.element, "removeListener") {
                let _ = remove.call2(&self.element, &event, &previous);
            }
        }

        let Some(on) = method(&self.element, "on") else {
            tracing::warn!(key, "graph div has no 'on' method; markers will not follow the view");
            return;
        };
        let chart = self.clone();
        let listener =
            Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| handler(&chart))
                .into_js_value();
        if let Err(err) = on.call2(&self.element, &event, &listener) {
            tracing::warn!(key, error = %js_message(&err), "failed to subscribe to relayout");
            return;
        }
        let _ = js_sys::Reflect::set(&handlers, &key_js, &listener);
    }
}

/// An `<svg>` layer of the chart.
#[derive(Debug)]
pub struct WebSurface {
    document: Document,
    element: Element,
}

impl MarkerSurface for WebSurface {
    fn bounding_box(&self) -> PixelSize {
        let rect = self.element.get_bounding_client_rect();
        pixel_size(rect.width(), rect.height())
    }

    fn remove_markers(&self, class_name: &str) -> usize {
        // The collection is live; snapshot it before removing.
        let found = self.document.get_elements_by_class_name(class_name);
        let elements: Vec<Element> = (0..found.length()).filter_map(|i| found.item(i)).collect();
        for element in &elements {
            element.remove();
        }
        elements.len()
    }

    fn append_marker(&self, marker: &Marker) -> plotmark::render::Result<()> {
        let surface_err = |err: JsValue| plotmark::render::Error::Surface {
            message: js_message(&err),
        };
        let circle = self
            .document
            .create_element_ns(Some(SVG_NS), "circle")
            .map_err(surface_err)?;
        for (name, value) in marker.attributes() {
            circle.set_attribute(name, &value).map_err(surface_err)?;
        }
        self.element.append_child(&circle).map_err(surface_err)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct WebContainer {
    element: HtmlElement,
}

impl ReportContainer for WebContainer {
    fn set_html(&self, html: &str) -> plotmark::render::Result<()> {
        self.element.set_inner_html(html);
        Ok(())
    }

    fn reveal(&self) {
        let options = web_sys::ScrollIntoViewOptions::new();
        options.set_behavior(web_sys::ScrollBehavior::Smooth);
        options.set_block(web_sys::ScrollLogicalPosition::End);
        self.element
            .scroll_into_view_with_scroll_into_view_options(&options);
    }
}

/// The current browser page. Notices are shown with `alert` and mirrored to the console.
#[derive(Debug)]
pub struct WebPage {
    window: Window,
    document: Document,
}

impl WebPage {
    pub fn current() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok(Self { window, document })
    }

    fn element(&self, locator: &ElementLocator) -> Option<Element> {
        self.document
            .get_elements_by_class_name(&locator.class_name)
            .item(u32::try_from(locator.index).ok()?)
    }
}

impl Page for WebPage {
    type Chart = WebChart;
    type Surface = WebSurface;
    type Container = WebContainer;

    fn prompt(&self, message: &str, default: &str) -> Option<String> {
        self.window
            .prompt_with_message_and_default(message, default)
            .ok()
            .flatten()
    }

    fn notify(&self, notice: &Notice) {
        let text = notice.to_string();
        if notice.is_fatal() {
            web_sys::console::error_1(&JsValue::from_str(&text));
        } else {
            web_sys::console::log_1(&JsValue::from_str(&text));
        }
        let _ = self.window.alert_with_message(&text);
    }

    fn find_chart(&self, locator: &ElementLocator) -> Option<Rc<WebChart>> {
        self.element(locator)
            .map(|element| Rc::new(WebChart { element }))
    }

    fn find_surface(&self, locator: &ElementLocator) -> Option<Rc<WebSurface>> {
        self.element(locator).map(|element| {
            Rc::new(WebSurface {
                document: self.document.clone(),
                element,
            })
        })
    }

    fn report_container(
        &self,
        id: &str,
        style: &str,
    ) -> plotmark::render::Result<(Rc<WebContainer>, ContainerState)> {
        let container_err = |err: JsValue| plotmark::render::Error::Container {
            message: js_message(&err),
        };
        if let Some(existing) = self.document.get_element_by_id(id) {
            let element = existing.dyn_into::<HtmlElement>().map_err(|_| {
                plotmark::render::Error::Container {
                    message: format!("element #{id} is not an HTML element"),
                }
            })?;
            web_sys::console::log_1(&JsValue::from_str(&format!(
                "Using existing output container div with ID: {id}"
            )));
            return Ok((Rc::new(WebContainer { element }), ContainerState::Reused));
        }

        let body = self
            .document
            .body()
            .ok_or_else(|| plotmark::render::Error::Container {
                message: "the document has no body".to_string(),
            })?;
        let element = self
            .document
            .create_element("div")
            .map_err(container_err)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| plotmark::render::Error::Container {
                message: "created element is not an HTML element".to_string(),
            })?;
        element.set_id(id);
        element.set_attribute("style", style).map_err(container_err)?;
        body.append_child(&element).map_err(container_err)?;
        web_sys::console::log_1(&JsValue::from_str(&format!(
            "Created new output container div with ID: {id}"
        )));
        Ok((Rc::new(WebContainer { element }), ContainerState::Created))
    }
}
