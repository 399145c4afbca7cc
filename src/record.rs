//! Row records.
//!
//! A [`Record`] is one database row as a mapping from column name to a
//! `serde_json::Value`. Records are what a [`RawResult`](crate::RawResult)
//! hands out and what a [`Hydrator`](crate::Hydrator) consumes.

use serde::{Deserialize, Serialize};
use serde_json::{map, Map, Value};

/// One database row: column name to value, in the order the columns were selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a column value, returning the previous value if the column was already present
    ///
    /// A new column goes after the existing ones; an existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    /// Get the value of a column
    ///
    /// A column holding SQL `NULL` returns `Some(&Value::Null)`; a column that is
    /// not part of the row returns `None`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Whether the row has a column with this name (even if its value is `NULL`)
    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Column names in select order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> map::Iter<'_> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into a JSON object map
    pub fn into_json_map(self) -> Map<String, Value> {
        self.0
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Build a record from a JSON object; any other JSON value is handed back as the error
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(other),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Textual form of a value used as a map key.
///
/// Strings are used verbatim and numbers in their decimal form. `true` is
/// `"1"`; `false` and `NULL` have the empty string as their textual form,
/// which the keyed flattening of a result set rejects. Arrays and objects
/// render as compact JSON.
pub fn key_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
