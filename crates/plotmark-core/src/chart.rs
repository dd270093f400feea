use crate::projector::{AxisRange, ResolvedPoint};
use crate::trace::Trace;
use crate::value::json_f64;
use crate::{Error, Result};
use serde_json::Value;

/// A serialized Plotly figure: `{ "data": [...], "layout": {...}, "_fullData": [...] }`.
///
/// `_fullData` is what the browser actually rendered (after defaults and transforms). When a
/// snapshot does not include it, the raw `data` doubles as the rendered values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    traces: Vec<Trace>,
    data: Vec<Value>,
    full_data: Option<Vec<Value>>,
    layout: Value,
}

impl ChartSnapshot {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(Error::InvalidChartData {
                message: "chart snapshot must be a JSON object".to_string(),
            });
        };
        let Some(Value::Array(data)) = root.remove("data") else {
            return Err(Error::InvalidChartData {
                message: "the chart does not have a valid 'data' array".to_string(),
            });
        };
        let full_data = match root.remove("_fullData") {
            Some(Value::Array(full)) => Some(full),
            _ => None,
        };
        let layout = root.remove("layout").unwrap_or(Value::Null);
        Ok(Self {
            traces: data.iter().map(Trace::from_json).collect(),
            data,
            full_data,
            layout,
        })
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn layout(&self) -> &Value {
        &self.layout
    }

    pub fn x_range(&self) -> Option<AxisRange> {
        AxisRange::from_json(self.layout.get("xaxis")?.get("range")?)
    }

    pub fn y_range(&self) -> Option<AxisRange> {
        AxisRange::from_json(self.layout.get("yaxis")?.get("range")?)
    }

    /// Replaces `layout.<axis>.range`, as a pan or zoom would.
    pub fn set_ranges(&mut self, x: Option<AxisRange>, y: Option<AxisRange>) {
        if !self.layout.is_object() {
            self.layout = Value::Object(Default::default());
        }
        for (key, range) in [("xaxis", x), ("yaxis", y)] {
            let Some(range) = range else {
                continue;
            };
            let Some(layout) = self.layout.as_object_mut() else {
                return;
            };
            let axis = layout
                .entry(key)
                .or_insert_with(|| Value::Object(Default::default()));
            if !axis.is_object() {
                *axis = Value::Object(Default::default());
            }
            if let Some(axis) = axis.as_object_mut() {
                axis.insert(
                    "range".to_string(),
                    serde_json::json!([range.start, range.end]),
                );
            }
        }
    }

    /// The rendered `(x, y)` of one point.
    pub fn resolved_point(&self, trace_index: usize, point_index: usize) -> ResolvedPoint {
        let rendered = self.full_data.as_ref().unwrap_or(&self.data);
        let Some(trace) = rendered.get(trace_index) else {
            return ResolvedPoint::default();
        };
        let component = |key: &str| {
            trace
                .get(key)?
                .as_array()?
                .get(point_index)
                .and_then(json_f64)
        };
        ResolvedPoint {
            x: component("x"),
            y: component("y"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_data_array() {
        let err = ChartSnapshot::from_value(json!({ "layout": {} })).unwrap_err();
        assert!(matches!(err, Error::InvalidChartData { .. }));
        let err = ChartSnapshot::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidChartData { .. }));
        assert!(matches!(
            ChartSnapshot::from_json_str("{").unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn reads_axis_ranges_from_layout() {
        let chart = ChartSnapshot::from_value(json!({
            "data": [],
            "layout": { "xaxis": { "range": [0, 10] }, "yaxis": { "range": [-1, 1] } }
        }))
        .unwrap();
        assert_eq!(chart.x_range(), Some(AxisRange::new(0.0, 10.0)));
        assert_eq!(chart.y_range(), Some(AxisRange::new(-1.0, 1.0)));
    }

    #[test]
    fn set_ranges_creates_missing_layout() {
        let mut chart = ChartSnapshot::from_value(json!({ "data": [] })).unwrap();
        assert_eq!(chart.x_range(), None);
        chart.set_ranges(Some(AxisRange::new(1.0, 2.0)), None);
        assert_eq!(chart.x_range(), Some(AxisRange::new(1.0, 2.0)));
        assert_eq!(chart.y_range(), None);
    }

    #[test]
    fn resolved_points_prefer_full_data() {
        let chart = ChartSnapshot::from_value(json!({
            "data": [{ "x": [1, 2], "y": [3, 4] }],
            "_fullData": [{ "x": [10, 20], "y": [30, "n/a"] }]
        }))
        .unwrap();
        assert_eq!(chart.resolved_point(0, 0), ResolvedPoint::new(10.0, 30.0));
        assert_eq!(
            chart.resolved_point(0, 1),
            ResolvedPoint { x: Some(20.0), y: None }
        );
        assert_eq!(chart.resolved_point(3, 0), ResolvedPoint::default());
    }

    #[test]
    fn resolved_points_fall_back_to_data() {
        let chart =
            ChartSnapshot::from_value(json!({ "data": [{ "x": [1], "y": [2] }] })).unwrap();
        assert_eq!(chart.resolved_point(0, 0), ResolvedPoint::new(1.0, 2.0));
        assert_eq!(chart.traces().len(), 1);
    }
}
