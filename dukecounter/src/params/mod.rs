//! Parameter loading.
//!
//! A parameter file is a flat list of `key: value` lines. Values are coerced
//! to integers, floats or strings on a best-effort basis; nothing in this
//! module rejects a value.

mod parser;
mod value;

pub use parser::{parse_line, parse_text};
pub use value::ParamValue;

use crate::errors::{DukeCounterError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::Path;
use std::str::FromStr;

/// The resolved mapping of configuration keys to typed values.
///
/// Keys keep the order in which they first appeared. Inserting an existing
/// key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: IndexMap<String, ParamValue>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a parameter file.
    ///
    /// # Errors
    ///
    /// Returns an IO error (e.g. not found) naming the path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| DukeCounterError::io(path, e))?;
        let params = parse_text(&text);
        tracing::debug!(path = %path.display(), count = params.len(), "Loaded parameter file");
        Ok(params)
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Gets a value, falling back to `default` when the key is absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<ParamValue>) -> ParamValue {
        self.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Gets a value rendered as text, falling back to `default`.
    #[must_use]
    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map_or_else(|| default.to_string(), ToString::to_string)
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` over this set.
    pub fn overlay(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }
}

impl FromStr for ParameterSet {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(parse_text(s))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}
