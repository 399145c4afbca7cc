//! Integration tests for hydrated result sets
//!
//! Rows come from `MemoryResult`, so these tests run without a database.

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use lifeguard_hydrator::{
    HydratingResultSet, HydrationError, KeyStrategy, LifeError, MemoryResult, Record,
    ResultSetError, ResultSetTrait, SerdeHydrator,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

fn users() -> HydratingResultSet<User, SerdeHydrator<User>> {
    HydratingResultSet::new(SerdeHydrator::new(), User::default())
}

fn foo_bar() -> MemoryResult {
    MemoryResult::new(vec![
        Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
        Record::try_from(json!({"id": 456, "name": "Bar"})).unwrap(),
    ])
}

fn initialized(result: MemoryResult) -> HydratingResultSet<User, SerdeHydrator<User>> {
    let mut set = users();
    set.initialize(Box::new(result)).unwrap();
    set
}

fn walk<S: ResultSetTrait>(set: &mut S) -> Vec<(usize, Arc<S::Object>)> {
    let mut seen = Vec::new();
    set.rewind();
    while set.valid() {
        if let (Some(key), Some(object)) = (set.key(), set.current()) {
            seen.push((key, object));
        }
        set.next();
    }
    seen
}

#[test]
fn test_to_map_by_position() {
    let mut set = initialized(foo_bar());
    let map = set.to_map(KeyStrategy::Position).unwrap();

    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["0", "1"]);
    assert_eq!(map.get("0").unwrap().name, "Foo");
    assert_eq!(map.get("1").unwrap().name, "Bar");
}

#[test]
fn test_to_map_by_field() {
    let mut set = initialized(foo_bar());
    let map = set.to_map(KeyStrategy::field("id")).unwrap();

    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["123", "456"]);
    assert_eq!(map.get("123").unwrap().name, "Foo");
    assert_eq!(map.get("456").unwrap().name, "Bar");
}

#[test]
fn test_to_map_by_derived_key() {
    let mut set = initialized(foo_bar());
    let map = set
        .to_map(KeyStrategy::derived(|user: &User| user.name.clone()))
        .unwrap();

    assert_eq!(map.get("Foo").unwrap().id, 123);
    assert_eq!(map.get("Bar").unwrap().id, 456);
}

#[test]
fn test_to_map_missing_field() {
    let mut set = initialized(foo_bar());
    let err = set.to_map(KeyStrategy::field("email")).unwrap_err();

    assert!(matches!(
        &err,
        ResultSetError::MissingKeyField { field, index: 0 } if field == "email"
    ));
    assert_eq!(err.to_string(), "Result set key \"email\" does not exist in row 0");
}

#[test]
fn test_to_map_field_missing_from_later_row() {
    let mut set = initialized(MemoryResult::new(vec![
        Record::try_from(json!({"id": 1, "name": "Foo", "email": "foo@example.com"})).unwrap(),
        Record::try_from(json!({"id": 2, "name": "Bar"})).unwrap(),
    ]));
    let err = set.to_map(KeyStrategy::field("email")).unwrap_err();

    assert!(matches!(
        &err,
        ResultSetError::MissingKeyField { field, index: 1 } if field == "email"
    ));
    assert_eq!(err.to_string(), "Result set key \"email\" does not exist in row 1");
}

#[test]
fn test_to_map_empty_derived_key() {
    let mut set = initialized(foo_bar());
    let err = set
        .to_map(KeyStrategy::derived(|user: &User| {
            if user.id == 456 {
                String::new()
            } else {
                user.name.clone()
            }
        }))
        .unwrap_err();

    assert!(matches!(err, ResultSetError::EmptyKey { index: 1, .. }));
}

#[test]
fn test_to_map_boolean_keys() {
    let mut set = initialized(foo_bar());
    let err = set
        .to_map(KeyStrategy::derived(|user: &User| user.id == 123))
        .unwrap_err();
    assert!(matches!(err, ResultSetError::EmptyKey { index: 1, .. }));

    let mut set = initialized(MemoryResult::new(vec![
        Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
    ]));
    let map = set.to_map(KeyStrategy::derived(|user: &User| user.id == 123)).unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1"]);
}

#[test]
fn test_to_map_null_field_is_empty_key() {
    let mut set = initialized(MemoryResult::new(vec![
        Record::try_from(json!({"id": 1, "name": "Foo", "email": null})).unwrap(),
    ]));
    let err = set.to_map(KeyStrategy::field("email")).unwrap_err();
    assert!(matches!(err, ResultSetError::EmptyKey { index: 0, .. }));
}

#[test]
fn test_to_map_duplicate_keys_last_write_wins() {
    let mut set = initialized(MemoryResult::new(vec![
        Record::try_from(json!({"id": 1, "name": "Foo"})).unwrap(),
        Record::try_from(json!({"id": 2, "name": "Bar"})).unwrap(),
        Record::try_from(json!({"id": 3, "name": "Foo"})).unwrap(),
    ]));
    let map = set.to_map(KeyStrategy::field("name")).unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get("Foo").unwrap().id, 3);
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Foo", "Bar"]);
}

#[test]
fn test_double_initialize_keeps_first_result() {
    let mut set = initialized(foo_bar());

    let err = set
        .initialize(Box::new(MemoryResult::new(vec![
            Record::try_from(json!({"id": 789, "name": "Baz"})).unwrap(),
        ])))
        .unwrap_err();

    assert!(matches!(err, ResultSetError::AlreadyInitialized));
    assert_eq!(set.count().unwrap(), 2);
    let names: Vec<_> = walk(&mut set).into_iter().map(|(_, u)| u.name.clone()).collect();
    assert_eq!(names, vec!["Foo", "Bar"]);
}

#[test]
fn test_count_comes_from_raw_result() {
    let set = initialized(foo_bar().with_row_count(123));
    assert_eq!(set.count().unwrap(), 123);
    assert_eq!(set.len(), 2);
}

#[test]
fn test_count_matches_iteration_length() {
    let mut set = initialized(foo_bar());
    assert_eq!(set.count().unwrap() as usize, walk(&mut set).len());
}

#[test]
fn test_rewind_replays_identical_sequence() {
    let mut set = initialized(foo_bar());

    let first = walk(&mut set);
    assert!(!set.valid());
    let second = walk(&mut set);

    assert_eq!(first.len(), 2);
    for ((k1, o1), (k2, o2)) in first.iter().zip(second.iter()) {
        assert_eq!(k1, k2);
        assert!(Arc::ptr_eq(o1, o2));
    }
}

#[test]
fn test_to_map_rewinds_cursor_first() {
    let mut set = initialized(foo_bar());
    set.next();
    set.next();
    assert!(!set.valid());

    assert_eq!(set.to_map(KeyStrategy::Position).unwrap().len(), 2);
}

#[test]
fn test_fetch_failure_surfaces_as_fetch_failed() {
    let mut set = users();
    let err = set
        .initialize(Box::new(MemoryResult::failing(LifeError::QueryError(
            "connection reset".to_string(),
        ))))
        .unwrap_err();

    assert!(matches!(err, ResultSetError::FetchFailed { .. }));
    assert!(std::error::Error::source(&err).is_some());
    assert!(set.count().is_err());
    assert!(set.current().is_none());
}

#[test]
fn test_empty_result() {
    let mut set = initialized(MemoryResult::empty());
    assert_eq!(set.count().unwrap(), 0);
    assert!(!set.valid());
    assert!(set.to_map(KeyStrategy::field("id")).unwrap().is_empty());
}

#[test]
fn test_each_object_is_hydrated_from_its_own_row() {
    let rows: Vec<Record> = (0..50i64)
        .map(|id| {
            let name: String = Name().fake();
            let email: String = SafeEmail().fake();
            Record::try_from(json!({"id": id, "name": name, "email": email})).unwrap()
        })
        .collect();

    let mut set = initialized(MemoryResult::new(rows.clone()));

    for (index, user) in walk(&mut set) {
        let record = &rows[index];
        assert_eq!(json!(user.id), record.get("id").cloned().unwrap());
        assert_eq!(json!(user.name), record.get("name").cloned().unwrap());
        assert_eq!(json!(user.email), record.get("email").cloned().unwrap());
    }
    assert_eq!(set.records(), rows.as_slice());
}

#[test]
fn test_prototype_values_survive_hydration() {
    let prototype = User {
        email: Some("unknown@example.com".to_string()),
        ..User::default()
    };
    let mut set = HydratingResultSet::new(SerdeHydrator::new(), prototype.clone());
    set.initialize(Box::new(foo_bar())).unwrap();

    for (_, user) in walk(&mut set) {
        assert_eq!(user.email, prototype.email);
    }
}

#[test]
fn test_closure_hydrator_error_aborts_initialize() {
    let hydrator = |record: &Record, mut user: User| -> Result<User, HydrationError> {
        user.name = record
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HydrationError::new("name is required"))?
            .to_string();
        Ok(user)
    };
    let mut set = HydratingResultSet::new(hydrator, User::default());

    let err = set
        .initialize(Box::new(MemoryResult::new(vec![
            Record::try_from(json!({"id": 1, "name": "Foo"})).unwrap(),
            Record::try_from(json!({"id": 2})).unwrap(),
        ])))
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to hydrate row 1: Hydration failed: name is required");
    assert!(!set.is_initialized());
}
