use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::ModelResult;

/// A single cached row.
///
/// The API hands out DTOs whose shape varies per collection, so a record is
/// kept as its JSON object and read through [`Record::field`], which only
/// ever yields scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a record from a JSON value, failing if it is not an object.
    pub fn from_value(value: Value) -> ModelResult<Self> {
        Ok(Self(serde_json::from_value(value)?))
    }

    /// Parses a record from a JSON object string.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(Self(serde_json::from_str(json)?))
    }

    /// Sets a field, returning the record for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Reads a scalar field. Null, missing, array and object values are absent.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        self.0.get(name).and_then(FieldValue::from_json)
    }

    /// Raw JSON access for fields that are not scalars.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Convenience accessor for numeric fields.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.field(name)? {
            FieldValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Convenience accessor for text fields.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Iterates over field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Serializes the record back to a JSON string.
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Lowercases text one character at a time.
///
/// Folding is applied per character so that `a.starts_with(b)` implies
/// `fold_case(a).starts_with(&fold_case(b))`; context-sensitive lowercasing
/// (such as Greek final sigma) would break that.
pub fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// The typed view of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    Bool(bool),
}

impl<'a> FieldValue<'a> {
    /// Reads a JSON scalar. Null, arrays and objects have no field value.
    pub fn from_json(value: &'a Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::Text(s)),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// String rendering used by prefix and substring matching.
    ///
    /// Integral numbers render without a fractional part (`34`, not `34.0`).
    pub fn stringify(&self) -> Cow<'a, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
            FieldValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}
