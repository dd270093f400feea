use crate::value::{js_string, js_truthy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One data series of the chart (`gd.data[i]`).
///
/// Every attribute is kept as raw JSON: charts in the wild mix numbers, strings, typed arrays
/// and scalars freely, and only shape checks are applied before anything is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customdata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
}

fn as_sequence(v: &Option<Value>) -> Option<&Vec<Value>> {
    v.as_ref()?.as_array()
}

impl Trace {
    /// Builds a trace from any JSON value. Non-object values yield an empty trace, which the
    /// walker later reports as malformed.
    pub fn from_json(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }

    /// Number of points, taken from the first parallel sequence present in priority order
    /// `x`, `y`, `labels`, `customdata`, `text`.
    ///
    /// `None` means the trace exposes none of them. A present but empty sequence yields
    /// `Some(0)` and does not fall through to the next candidate.
    pub fn point_count(&self) -> Option<usize> {
        [&self.x, &self.y, &self.labels, &self.customdata, &self.text]
            .into_iter()
            .find_map(as_sequence)
            .map(Vec::len)
    }

    /// The trace's label, if it has a usable one.
    pub fn label(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        if !js_truthy(name) {
            return None;
        }
        Some(js_string(name))
    }

    pub fn display_name(&self, index: usize) -> String {
        self.label()
            .unwrap_or_else(|| format!("Unnamed Trace {index}"))
    }

    pub fn customdata_at(&self, point_index: usize) -> Option<&Value> {
        as_sequence(&self.customdata)?.get(point_index)
    }

    /// Hover text for one point.
    ///
    /// A `text` sequence is indexed directly. A scalar `text` only applies when the trace has
    /// exactly one point.
    pub fn text_at(&self, point_index: usize, point_count: usize) -> Option<String> {
        let text = self.text.as_ref()?;
        match text {
            Value::Array(items) => items.get(point_index).map(js_string),
            scalar if js_truthy(scalar) && point_count == 1 && point_index == 0 => {
                Some(js_string(scalar))
            }
            _ => None,
        }
    }
}
