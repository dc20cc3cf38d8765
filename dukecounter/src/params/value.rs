//! Tagged parameter values and best-effort coercion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single parameter value as read from the parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// Anything that did not convert to a number.
    Str(String),
}

impl ParamValue {
    /// Coerces raw text into a value. Never fails.
    ///
    /// Text containing a `.` is tried as a float, anything else as an
    /// integer. When the conversion fails the trimmed text is kept verbatim,
    /// so `./out.dir` stays a string.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        let text = raw.trim();
        let parsed = if text.contains('.') {
            text.parse::<f64>().ok().map(Self::Float)
        } else {
            text.parse::<i64>().ok().map(Self::Int)
        };
        parsed.unwrap_or_else(|| Self::Str(text.to_string()))
    }

    /// Returns the value as a float when it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Debug keeps the decimal point on integral floats (120.0).
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
