//! Request parameter model.
//!
//! Parameters are a string-keyed map of [`ParamValue`]s. The map serializes
//! into a JSON object body or into form-urlencoded pairs depending on the
//! engine's encoding method. `BTreeMap` keeps serialization order stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A string-keyed parameter map for POST and PUT bodies.
pub type Params = BTreeMap<String, ParamValue>;

/// A single parameter value.
///
/// Serializes untagged, so a map of values renders as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Text value.
    String(String),
    /// Integer value.
    Number(i64),
    /// Boolean value.
    Bool(bool),
    /// Ordered list of values.
    Array(Vec<ParamValue>),
    /// Nested string-keyed map.
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Render the value for a form-urlencoded pair.
    ///
    /// Scalars render directly; arrays and maps render as compact JSON text
    /// since form encoding has no nesting of its own.
    pub(crate) fn form_value(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Array(_) | Self::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(value: Vec<ParamValue>) -> Self {
        Self::Array(value)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(value: BTreeMap<String, ParamValue>) -> Self {
        Self::Map(value)
    }
}

/// Build a [`Params`] map from string pairs.
pub fn params_from_pairs<K, V, I>(pairs: I) -> Params
where
    K: Into<String>,
    V: Into<ParamValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
