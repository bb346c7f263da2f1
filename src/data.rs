//! Data bound to templates at render time
//!
//! Values are resolved once when data enters the engine: a [`Value`] is
//! either replacement markup, a nested [`Record`] scope, or a sequence of
//! repetition items.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::Attributes;

/// Key binding the root of the template (or rendered sub-node)
pub const ROOT_KEY: &str = "_root";

/// Errors raised while ingesting external data
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid JSON data: {0}")]
    Json(#[from] serde_json::Error),
}

/// A value bound to a point
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Markup replacing the element's inner content
    Scalar(String),
    /// A nested scope
    Item(Record),
    /// Repetition items
    Sequence(Vec<Value>),
}

impl Value {
    /// Convert a JSON value; `null` yields `None`
    pub fn from_json(json: serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;
        match json {
            Json::Null => None,
            Json::Bool(b) => Some(Value::Scalar(b.to_string())),
            Json::Number(n) => Some(Value::Scalar(n.to_string())),
            Json::String(s) => Some(Value::Scalar(s)),
            // null items keep their position so index-aligned overrides still line up
            Json::Array(items) => Some(Value::Sequence(
                items
                    .into_iter()
                    .map(|item| Value::from_json(item).unwrap_or_else(|| Value::Item(Record::new())))
                    .collect(),
            )),
            Json::Object(map) => Some(Value::Item(Record::from_json_map(map))),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Record> {
        match self {
            Value::Item(r) => Some(r),
            _ => None,
        }
    }

    /// Interpret this value as an attribute override
    ///
    /// An item contributes its scalar fields. A sequence is index-aligned:
    /// `index` selects the entry, and without an index nothing applies.
    pub fn attributes_at(&self, index: Option<usize>) -> Option<Attributes> {
        match (self, index) {
            (Value::Item(record), _) => Some(record.scalar_attributes()),
            (Value::Sequence(items), Some(i)) => items.get(i).and_then(|v| v.attributes_at(None)),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Item(_) => "item",
            Value::Sequence(_) => "sequence",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Item(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}

/// Ordered map from point name to value
///
/// Attribute overrides for a point live under `@<point>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document whose top level must be an object
    pub fn from_json_str(json: &str) -> Result<Record, DataError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Record::from_json(value)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Record, DataError> {
        use serde_json::Value as Json;
        match json {
            Json::Object(map) => Ok(Record::from_json_map(map)),
            Json::Null => Err(DataError::NotAnObject { found: "null" }),
            Json::Bool(_) => Err(DataError::NotAnObject { found: "a boolean" }),
            Json::Number(_) => Err(DataError::NotAnObject { found: "a number" }),
            Json::String(_) => Err(DataError::NotAnObject { found: "a string" }),
            Json::Array(_) => Err(DataError::NotAnObject { found: "an array" }),
        }
    }

    fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Record {
        Record(
            map.into_iter()
                .filter_map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`Record::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set the attribute override for `point`
    pub fn set_attributes(&mut self, point: &str, attributes: &Attributes) {
        let record: Record = Record(
            attributes
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Scalar(v.to_string())))
                .collect(),
        );
        self.0.insert(attribute_key(point), Value::Item(record));
    }

    /// Builder form of [`Record::set_attributes`]
    pub fn with_attributes<K, V>(mut self, point: &str, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes: Attributes = attributes.into_iter().collect();
        self.set_attributes(point, &attributes);
        self
    }

    /// Set index-aligned attribute overrides for a repeated `point`
    pub fn with_attributes_each(mut self, point: &str, each: Vec<Attributes>) -> Self {
        let items = each
            .iter()
            .map(|attrs| {
                let mut item = Record::new();
                for (k, v) in attrs.iter() {
                    item.insert(k, v);
                }
                Value::Item(item)
            })
            .collect();
        self.0.insert(attribute_key(point), Value::Sequence(items));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn scalar_attributes(&self) -> Attributes {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_scalar().map(|s| (k.as_str(), s)))
            .collect()
    }
}

/// Key under which the attribute override of `point` is stored
pub fn attribute_key(point: &str) -> String {
    format!("@{}", point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json_shapes() {
        let record = Record::from_json_str(
            r#"{"title": "Hi", "count": 3, "items": ["a", null, {"x": "y"}], "gone": null}"#,
        )
        .expect("Should parse");

        assert_eq!(record.get("title"), Some(&Value::from("Hi")));
        assert_eq!(record.get("count"), Some(&Value::from("3")));
        assert!(!record.contains_key("gone"));
        match record.get("items") {
            Some(Value::Sequence(items)) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1], Value::Item(Record::new()));
                assert_eq!(items[2], Value::Item(Record::new().with("x", "y")));
            }
            other => panic!("Expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = Record::from_json_str(r#"["a"]"#).unwrap_err();
        assert!(matches!(err, DataError::NotAnObject { found: "an array" }));
        assert!(matches!(Record::from_json_str("{"), Err(DataError::Json(_))));
    }

    #[test]
    fn test_attribute_overrides() {
        let record = Record::new().with_attributes("title", [("class", "big")]);
        let attrs = record
            .get("@title")
            .and_then(|v| v.attributes_at(None))
            .expect("Should have attributes");
        assert_eq!(attrs.get("class"), Some("big"));
    }

    #[test]
    fn test_indexed_attribute_overrides() {
        let each = vec![
            [("class", "first")].into_iter().collect(),
            [("class", "second")].into_iter().collect(),
        ];
        let record = Record::new().with_attributes_each("items", each);
        let value = record.get("@items").expect("Should be set");
        assert_eq!(value.attributes_at(Some(1)).unwrap().get("class"), Some("second"));
        assert!(value.attributes_at(Some(2)).is_none());
        assert!(value.attributes_at(None).is_none());
    }
}
