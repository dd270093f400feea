use crate::value::js_string;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;

/// One field of a point's `customdata` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MetaField {
    Present(String),
    /// The record exists but does not carry this field.
    Missing,
    /// The point has no object-shaped record at all.
    NoRecord,
}

impl MetaField {
    pub fn as_present(&self) -> Option<&str> {
        match self {
            MetaField::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Text shown for this field, e.g. `N/A (url missing)`.
    pub fn display(&self, field_name: &str) -> Cow<'_, str> {
        match self {
            MetaField::Present(v) => Cow::Borrowed(v),
            MetaField::Missing => Cow::Owned(format!("N/A ({field_name} missing)")),
            MetaField::NoRecord => Cow::Borrowed("N/A"),
        }
    }
}

/// Per-point auxiliary record extracted from `customdata[j]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointMetadata {
    pub arg_id: MetaField,
    pub url: MetaField,
}

impl PointMetadata {
    pub const ARG_ID_FIELD: &'static str = "arg_id";
    pub const URL_FIELD: &'static str = "url";

    pub fn no_record() -> Self {
        Self {
            arg_id: MetaField::NoRecord,
            url: MetaField::NoRecord,
        }
    }

    /// Arrays count as records (they are objects in the browser) but never carry named fields.
    pub fn from_customdata(item: Option<&Value>) -> Self {
        let Some(item) = item else {
            return Self::no_record();
        };
        match item {
            Value::Object(record) => {
                let field = |name: &str| match record.get(name) {
                    Some(v) => MetaField::Present(js_string(v)),
                    None => MetaField::Missing,
                };
                Self {
                    arg_id: field(Self::ARG_ID_FIELD),
                    url: field(Self::URL_FIELD),
                }
            }
            Value::Array(_) => Self {
                arg_id: MetaField::Missing,
                url: MetaField::Missing,
            },
            _ => Self::no_record(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_present()
    }
}
