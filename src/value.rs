/// RecordView Field Values
///
/// Every cell of a dataset holds one of three kinds of value: a string, a
/// number, or null. Values arrive from providers as JSON and are narrowed to
/// this set on the way in.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(f64),
    String(String),
}

impl FieldValue {
    /// Narrow a JSON value to a field value.
    ///
    /// Booleans become the strings `"true"`/`"false"` and nested arrays or
    /// objects become their compact JSON text.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::String(b.to_string()),
            JsonValue::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::String(n.to_string()),
            },
            JsonValue::String(s) => FieldValue::String(s),
            other => FieldValue::String(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True for null and for the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// String form of a non-null value; `None` for null.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(Cow::Borrowed(s.as_str())),
            FieldValue::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }

    /// Text shown in a rendered cell. Null renders as an empty cell.
    pub fn display_text(&self) -> String {
        self.text().map(Cow::into_owned).unwrap_or_default()
    }

    /// Numeric reading of the value, if it has one.
    ///
    /// Strings are trimmed and parsed as a decimal number. Text that only
    /// parses to infinity or NaN (`"inf"`, `"NaN"`) is not treated as numeric.
    pub fn parse_number(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) => Some(*n),
            FieldValue::String(s) => parse_number(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Parse user or cell text as a finite number.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
