//! Key strategies and the keyed mapping produced by flattening a result set.

use crate::record::Record;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// How `to_map` derives the key of each object
pub enum KeyStrategy<'a, T> {
    /// Positional index of the row (`0..n`)
    Position,
    /// Value of a column of the row's record
    Field(&'a str),
    /// Value computed from the hydrated object
    Derived(Box<dyn Fn(&T) -> Value + 'a>),
}

impl<'a, T> KeyStrategy<'a, T> {
    pub fn position() -> Self {
        KeyStrategy::Position
    }

    pub fn field(column: &'a str) -> Self {
        KeyStrategy::Field(column)
    }

    /// Key each object by whatever `f` returns for it
    ///
    /// Anything convertible into a JSON value works as a key: strings,
    /// integers, booleans, `Option`s (where `None` is an empty key).
    pub fn derived<K, F>(f: F) -> Self
    where
        F: Fn(&T) -> K + 'a,
        K: Into<Value>,
    {
        KeyStrategy::Derived(Box::new(move |object| f(object).into()))
    }

    /// Derive the key value for the object at `index`; `None` when the key column is missing
    pub(crate) fn key_value(&self, index: usize, record: &Record, object: &T) -> Option<Value> {
        match self {
            KeyStrategy::Position => Some(Value::from(index)),
            KeyStrategy::Field(column) => record.get(column).cloned(),
            KeyStrategy::Derived(f) => Some(f(object)),
        }
    }

    /// Short label used in error messages and spans
    pub(crate) fn label(&self) -> String {
        match self {
            KeyStrategy::Position => "<position>".to_string(),
            KeyStrategy::Field(column) => (*column).to_string(),
            KeyStrategy::Derived(_) => "<derived>".to_string(),
        }
    }
}

impl<T> Default for KeyStrategy<'_, T> {
    fn default() -> Self {
        KeyStrategy::Position
    }
}

impl<'a, T> From<&'a str> for KeyStrategy<'a, T> {
    fn from(column: &'a str) -> Self {
        KeyStrategy::Field(column)
    }
}

impl<T> fmt::Debug for KeyStrategy<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::Position => f.write_str("Position"),
            KeyStrategy::Field(column) => f.debug_tuple("Field").field(column).finish(),
            KeyStrategy::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Insertion-ordered map from textual key to value
///
/// Inserting an existing key replaces its value in place: the entry keeps the
/// position of its first insertion.
#[derive(Clone, PartialEq)]
pub struct KeyedObjects<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> KeyedObjects<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a value, returning the value it replaced
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        match self.positions.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.positions.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<V> Default for KeyedObjects<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for KeyedObjects<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> IntoIterator for KeyedObjects<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_objects_keep_insertion_order() {
        let mut map = KeyedObjects::new();
        map.insert("10".to_string(), "ten");
        map.insert("2".to_string(), "two");
        map.insert("b".to_string(), "bee");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["10", "2", "b"]);
    }

    #[test]
    fn test_keyed_objects_overwrite_keeps_first_position() {
        let mut map = KeyedObjects::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        assert_eq!(map.insert("a".to_string(), 3), Some(1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("a", &3), ("b", &2)]);
    }

    #[test]
    fn test_key_strategy_values() {
        let record = Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap();
        let object = "object";

        assert_eq!(KeyStrategy::<&str>::position().key_value(4, &record, &object), Some(json!(4)));
        assert_eq!(KeyStrategy::<&str>::field("id").key_value(0, &record, &object), Some(json!(123)));
        assert_eq!(KeyStrategy::<&str>::field("nope").key_value(0, &record, &object), None);

        let derived = KeyStrategy::derived(|o: &&str| o.len());
        assert_eq!(derived.key_value(0, &record, &object), Some(json!(6)));
        assert_eq!(derived.label(), "<derived>");
    }

    #[test]
    fn test_key_strategy_from_str() {
        let strategy: KeyStrategy<'_, ()> = "email".into();
        assert!(matches!(strategy, KeyStrategy::Field("email")));
        assert_eq!(format!("{strategy:?}"), r#"Field("email")"#);
    }
}
