use crate::walker::TraceStride;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Layered JSON configuration addressed by dotted paths (`"marker.radius"`).
///
/// Values set here are merged onto [`PlotmarkConfig::defaults`] when the typed [`Settings`] view
/// is resolved, so callers only need to carry the keys they override.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotmarkConfig(Value);

impl Default for PlotmarkConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl PlotmarkConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// The built-in configuration, targeting a standard Plotly page.
    pub fn defaults() -> Self {
        Self(json!({
            "chart": { "className": "js-plotly-plot", "index": 0 },
            "surface": { "className": "main-svg", "index": 2 },
            "report": { "containerId": "plotlySmartFilteredDataOutput" },
            "marker": {
                "className": "dynamic-indicator-circle",
                "radius": 8.0,
                "fill": "rgba(255, 165, 0, 0.8)",
                "stroke": "black",
                "strokeWidth": 2.0
            },
            "filter": { "urlBase": "https://github.com/team-mirai/policy/pull/" },
            "traces": { "start": 0, "step": 2 }
        }))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?.as_f64()
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.lookup(dotted_path)?.as_u64()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    /// Writes `value` at `dotted_path`. Non-object roots and intermediate scalars are replaced
    /// by objects.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        if let Value::Object(root) = &mut self.0 {
            insert_at(root, dotted_path, value);
            return;
        }
        let mut root = Map::new();
        insert_at(&mut root, dotted_path, value);
        self.0 = Value::Object(root);
    }

    /// Objects merge key by key; any other incoming value replaces what was there.
    pub fn deep_merge(&mut self, other: &Value) {
        merge_into(&mut self.0, other);
    }

    /// Resolves the typed settings view (defaults first, then this config on top).
    pub fn settings(&self) -> Result<Settings> {
        let mut merged = Self::defaults();
        merged.deep_merge(&self.0);
        let settings = Settings::deserialize(merged.as_value()).map_err(|err| {
            Error::InvalidConfig {
                message: err.to_string(),
            }
        })?;
        settings.validate()?;
        Ok(settings)
    }
}

fn insert_at(map: &mut Map<String, Value>, dotted_path: &str, value: Value) {
    let Some((head, rest)) = dotted_path.split_once('.') else {
        map.insert(dotted_path.to_string(), value);
        return;
    };
    let child = map.entry(head).or_insert(Value::Null);
    if let Value::Object(child) = child {
        insert_at(child, rest, value);
        return;
    }
    let mut fresh = Map::new();
    insert_at(&mut fresh, rest, value);
    *child = Value::Object(fresh);
}

fn merge_into(base: &mut Value, incoming: &Value) {
    if let (Value::Object(base), Value::Object(incoming)) = (&mut *base, incoming) {
        for (key, value) in incoming {
            merge_into(base.entry(key.as_str()).or_insert(Value::Null), value);
        }
        return;
    }
    *base = incoming.clone();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub chart: ElementLocator,
    pub surface: ElementLocator,
    pub report: ReportSettings,
    pub marker: MarkerSettings,
    pub filter: FilterSettings,
    pub traces: TraceStride,
}

/// Which element of a class-name lookup to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLocator {
    pub class_name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSettings {
    pub class_name: String,
    pub radius: f64,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    /// Prefix the pull-request number is appended to.
    pub url_base: String,
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.traces.step == 0 {
            return Err(Error::InvalidConfig {
                message: "traces.step must be at least 1".to_string(),
            });
        }
        if self.marker.class_name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "marker.className must not be empty".to_string(),
            });
        }
        if self.report.container_id.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "report.containerId must not be empty".to_string(),
            });
        }
        if !(self.marker.radius.is_finite() && self.marker.radius > 0.0) {
            return Err(Error::InvalidConfig {
                message: format!("marker.radius must be positive, got {}", self.marker.radius),
            });
        }
        let base = url::Url::parse(&self.filter.url_base)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig {
                message: format!("filter.urlBase is not a hierarchical URL: {base}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_a_standard_plotly_page() {
        let settings = PlotmarkConfig::default().settings().unwrap();
        assert_eq!(settings.chart.class_name, "js-plotly-plot");
        assert_eq!(settings.chart.index, 0);
        assert_eq!(settings.surface.class_name, "main-svg");
        assert_eq!(settings.surface.index, 2);
        assert_eq!(settings.report.container_id, "plotlySmartFilteredDataOutput");
        assert_eq!(settings.marker.class_name, "dynamic-indicator-circle");
        assert_eq!(settings.marker.radius, 8.0);
        assert_eq!(settings.traces, TraceStride::PAIRED);
        assert_eq!(
            settings.filter.url_base,
            "https://github.com/team-mirai/policy/pull/"
        );
    }

    #[test]
    fn overrides_merge_onto_defaults() {
        let mut cfg = PlotmarkConfig::empty_object();
        cfg.set_value("surface.index", json!(0));
        cfg.set_value("marker.fill", json!("red"));
        let settings = cfg.settings().unwrap();
        assert_eq!(settings.surface.index, 0);
        assert_eq!(settings.surface.class_name, "main-svg");
        assert_eq!(settings.marker.fill, "red");
        assert_eq!(settings.marker.stroke, "black");
    }

    #[test]
    fn dotted_getters_walk_nested_objects() {
        let cfg = PlotmarkConfig::defaults();
        assert_eq!(cfg.get_str("chart.className"), Some("js-plotly-plot"));
        assert_eq!(cfg.get_u64("traces.step"), Some(2));
        assert_eq!(cfg.get_f64("marker.strokeWidth"), Some(2.0));
        assert_eq!(cfg.get_bool("marker.fill"), None);
        assert_eq!(cfg.get_str("chart.missing"), None);
    }

    #[test]
    fn set_value_coerces_non_object_roots() {
        let mut cfg = PlotmarkConfig::from_value(json!(42));
        cfg.set_value("report.containerId", json!("out"));
        assert_eq!(cfg.get_str("report.containerId"), Some("out"));
    }

    #[test]
    fn set_value_replaces_scalar_parents() {
        let mut cfg = PlotmarkConfig::from_value(json!({ "marker": 3, "chart": { "index": 1 } }));
        cfg.set_value("marker.fill", json!("red"));
        cfg.set_value("chart.className", json!("graph"));
        assert_eq!(
            cfg.as_value(),
            &json!({
                "marker": { "fill": "red" },
                "chart": { "index": 1, "className": "graph" }
            })
        );
    }

    #[test]
    fn deep_merge_keeps_siblings_and_replaces_leaves() {
        let mut cfg = PlotmarkConfig::defaults();
        cfg.deep_merge(&json!({
            "marker": { "radius": 4.0 },
            "traces": [1, 2],
            "extra": { "nested": true }
        }));
        assert_eq!(cfg.get_f64("marker.radius"), Some(4.0));
        assert_eq!(cfg.get_str("marker.stroke"), Some("black"));
        assert_eq!(cfg.as_value()["traces"], json!([1, 2]));
        assert_eq!(cfg.get_bool("extra.nested"), Some(true));
    }

    #[test]
    fn zero_trace_step_is_rejected() {
        let cfg = PlotmarkConfig::from_value(json!({ "traces": { "step": 0 } }));
        let err = cfg.settings().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }), "{err}");
    }

    #[test]
    fn opaque_url_base_is_rejected() {
        let cfg = PlotmarkConfig::from_value(json!({ "filter": { "urlBase": "mailto:pr" } }));
        assert!(matches!(
            cfg.settings().unwrap_err(),
            Error::InvalidConfig { .. }
        ));

        let cfg = PlotmarkConfig::from_value(json!({ "filter": { "urlBase": "not a url" } }));
        assert!(matches!(cfg.settings().unwrap_err(), Error::Url(_)));
    }

    #[test]
    fn wrong_value_types_are_config_errors() {
        let cfg = PlotmarkConfig::from_value(json!({ "surface": { "index": "two" } }));
        assert!(matches!(
            cfg.settings().unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }
}
