//! Action parameters and results.
//!
//! Parameters arrive as the JSON object printed by `action-get`. Results are
//! a JSON object that is flattened into `key=value` pairs for `action-set`:
//! nested objects become dotted keys and non-string leaves are rendered as
//! compact JSON text.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading action parameters.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParamError {
    /// A required parameter was not supplied.
    #[error("missing action parameter: {name}")]
    Missing {
        /// Parameter name.
        name: String,
    },
    /// A parameter was supplied with the wrong type.
    #[error("action parameter {name} must be {expected}")]
    Invalid {
        /// Parameter name.
        name: String,
        /// Description of the accepted type.
        expected: &'static str,
    },
}

/// Parameters passed to an action invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionParams(Map<String, Value>);

impl ActionParams {
    /// Wraps an already-decoded parameter map.
    #[must_use]
    pub const fn new(params: Map<String, Value>) -> Self {
        Self(params)
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a required string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Missing`] when absent and
    /// [`ParamError::Invalid`] when not a string.
    pub fn required_str(&self, name: &str) -> Result<&str, ParamError> {
        self.optional_str(name)?.ok_or_else(|| ParamError::Missing {
            name: name.to_owned(),
        })
    }

    /// Returns an optional string parameter. JSON `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] when the value is not a string.
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(ParamError::Invalid {
                name: name.to_owned(),
                expected: "a string",
            }),
        }
    }

    /// Returns an optional unsigned integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] when the value is not a non-negative
    /// integer that fits in `u32`.
    pub fn optional_u32(&self, name: &str) -> Result<Option<u32>, ParamError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(Some)
                .ok_or_else(|| ParamError::Invalid {
                    name: name.to_owned(),
                    expected: "a non-negative integer",
                }),
        }
    }
}

impl From<Map<String, Value>> for ActionParams {
    fn from(params: Map<String, Value>) -> Self {
        Self::new(params)
    }
}

/// Structured results attached to an action invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionResults(Map<String, Value>);

impl ActionResults {
    /// Creates an empty result map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a result map returned by a collaborator verbatim.
    #[must_use]
    pub const fn from_map(results: Map<String, Value>) -> Self {
        Self(results)
    }

    /// Inserts a result value, replacing any previous value for `key`.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_owned(), value.into());
    }

    /// Returns a result value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` when no results are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Flattens the results into `(key, value)` pairs for `action-set`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(key, value, &mut pairs);
        }
        pairs
    }
}

fn flatten_into(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(&format!("{prefix}.{key}"), nested, pairs);
            }
        }
        Value::String(text) => pairs.push((prefix.to_owned(), text.clone())),
        other => pairs.push((prefix.to_owned(), other.to_string())),
    }
}

/// Splits a comma-separated node list. Segments are kept verbatim,
/// including empty ones.
#[must_use]
pub fn split_nodes(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_owned).collect()
}
