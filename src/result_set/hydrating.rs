//! `HydratingResultSet`: the result set that turns records into objects via a `Hydrator`.

use super::{KeyStrategy, KeyedObjects, ResultSetError, ResultSetTrait};
use crate::executor::RawResult;
use crate::hydrator::Hydrator;
use crate::record::{key_text, Record};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Everything that exists only after initialization
struct Materialized<T> {
    result: Box<dyn RawResult>,
    records: Vec<Record>,
    objects: Vec<Arc<T>>,
}

/// Result set hydrating each row into a clone of an object prototype
///
/// `records[i]` and `objects[i]` always describe the same row.
pub struct HydratingResultSet<T, H> {
    hydrator: Arc<H>,
    prototype: T,
    state: Option<Materialized<T>>,
    cursor: usize,
}

impl<T, H> HydratingResultSet<T, H>
where
    T: Clone,
    H: Hydrator<T>,
{
    pub fn new(hydrator: H, prototype: T) -> Self {
        Self::with_shared_hydrator(Arc::new(hydrator), prototype)
    }

    /// Build a result set around a hydrator that is already shared
    pub fn with_shared_hydrator(hydrator: Arc<H>, prototype: T) -> Self {
        Self {
            hydrator,
            prototype,
            state: None,
            cursor: 0,
        }
    }

    pub fn hydrator(&self) -> &H {
        &self.hydrator
    }

    pub fn prototype(&self) -> &T {
        &self.prototype
    }

    /// The fetched records, index-aligned with the objects
    pub fn records(&self) -> &[Record] {
        self.state.as_ref().map_or(&[], |state| state.records.as_slice())
    }

    /// Number of hydrated objects (0 before initialization)
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.objects.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the hydrated objects without touching the cursor
    pub fn iter(&self) -> Objects<'_, T> {
        let objects = self.state.as_ref().map_or(&[][..], |state| state.objects.as_slice());
        Objects {
            inner: objects.iter().enumerate(),
        }
    }

    fn hydrate_all(&self, records: &[Record]) -> Result<Vec<Arc<T>>, ResultSetError> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.hydrator
                    .hydrate(record, self.prototype.clone())
                    .map(Arc::new)
                    .map_err(|source| ResultSetError::HydrationFailed { index, source })
            })
            .collect()
    }
}

impl<T, H> ResultSetTrait for HydratingResultSet<T, H>
where
    T: Clone,
    H: Hydrator<T>,
{
    type Object = T;

    fn fresh(&self) -> Self {
        Self::with_shared_hydrator(Arc::clone(&self.hydrator), self.prototype.clone())
    }

    fn initialize(&mut self, mut result: Box<dyn RawResult>) -> Result<(), ResultSetError> {
        if self.state.is_some() {
            return Err(ResultSetError::AlreadyInitialized);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::initialize_span().entered();

        let start = Instant::now();
        let records = result.fetch_all_rows().map_err(ResultSetError::fetch_failed)?;
        let objects = self.hydrate_all(&records)?;

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_hydration(objects.len(), duration);
        log::debug!("hydrated {} row(s) in {:?}", objects.len(), duration);

        self.state = Some(Materialized {
            result,
            records,
            objects,
        });
        self.cursor = 0;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn raw_result(&self) -> Option<&dyn RawResult> {
        self.state.as_ref().map(|state| state.result.as_ref())
    }

    fn count(&self) -> Result<u64, ResultSetError> {
        let state = self.state.as_ref().ok_or(ResultSetError::NotInitialized)?;
        state.result.row_count().map_err(ResultSetError::fetch_failed)
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn next(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    fn current(&self) -> Option<Arc<T>> {
        self.state
            .as_ref()
            .and_then(|state| state.objects.get(self.cursor))
            .cloned()
    }

    fn key(&self) -> Option<usize> {
        (self.cursor < self.len()).then_some(self.cursor)
    }

    fn to_map(&mut self, strategy: KeyStrategy<'_, T>) -> Result<KeyedObjects<Arc<T>>, ResultSetError> {
        if self.state.is_none() {
            return Err(ResultSetError::NotInitialized);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::to_map_span(&strategy.label()).entered();

        let mut map = KeyedObjects::with_capacity(self.len());

        self.rewind();
        while let (Some(index), Some(object)) = (self.key(), self.current()) {
            let record = &self.records()[index];
            let value = strategy
                .key_value(index, record, &object)
                .ok_or_else(|| ResultSetError::MissingKeyField {
                    field: strategy.label(),
                    index,
                })?;

            let key = key_text(&value);
            if key.is_empty() {
                return Err(ResultSetError::EmptyKey {
                    strategy: strategy.label(),
                    index,
                });
            }

            map.insert(key, object);
            self.next();
        }

        Ok(map)
    }
}

impl<T: fmt::Debug, H> fmt::Debug for HydratingResultSet<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HydratingResultSet")
            .field("prototype", &self.prototype)
            .field("initialized", &self.state.is_some())
            .field("rows", &self.state.as_ref().map(|state| state.objects.len()))
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Iterator over `(index, object)` pairs of a result set, independent of its cursor
pub struct Objects<'a, T> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Arc<T>>>,
}

impl<'a, T> Iterator for Objects<'a, T> {
    type Item = (usize, &'a Arc<T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Objects<'_, T> {}

impl<'a, T, H> IntoIterator for &'a HydratingResultSet<T, H>
where
    T: Clone,
    H: Hydrator<T>,
{
    type Item = (usize, &'a Arc<T>);
    type IntoIter = Objects<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::LifeError;
    use crate::hydrator::HydrationError;
    use crate::memory::MemoryResult;
    use serde_json::{json, Value};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Row {
        id: i64,
        name: String,
    }

    fn hydrate_row(record: &Record, mut row: Row) -> Result<Row, HydrationError> {
        row.id = record.get("id").and_then(Value::as_i64).unwrap_or_default();
        row.name = record.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(row)
    }

    type FnHydrator = fn(&Record, Row) -> Result<Row, HydrationError>;

    fn result_set() -> HydratingResultSet<Row, FnHydrator> {
        HydratingResultSet::new(hydrate_row as FnHydrator, Row::default())
    }

    fn records() -> Vec<Record> {
        vec![
            Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
            Record::try_from(json!({"id": 456, "name": "Bar"})).unwrap(),
        ]
    }

    #[test]
    fn test_uninitialized_state() {
        let mut set = result_set();
        assert!(!set.is_initialized());
        assert!(set.raw_result().is_none());
        assert!(matches!(set.count(), Err(ResultSetError::NotInitialized)));
        assert!(matches!(set.to_map(KeyStrategy::Position), Err(ResultSetError::NotInitialized)));
        assert!(set.current().is_none());
        assert!(!set.valid());
        assert_eq!(set.key(), None);
        set.next();
        assert_eq!(set.key(), None);
    }

    #[test]
    fn test_cursor_walks_rows_in_order() {
        let mut set = result_set();
        set.initialize(Box::new(MemoryResult::new(records()))).unwrap();

        assert_eq!(set.key(), Some(0));
        assert_eq!(set.current().unwrap().name, "Foo");
        set.next();
        assert_eq!(set.key(), Some(1));
        assert_eq!(set.current().unwrap().name, "Bar");
        set.next();
        assert_eq!(set.key(), None);
        assert!(!set.valid());

        // stays exhausted
        set.next();
        assert_eq!(set.key(), None);

        set.rewind();
        assert_eq!(set.key(), Some(0));
        assert!(set.valid());
    }

    #[test]
    fn test_count_after_initialize() {
        let mut set = result_set();
        set.initialize(Box::new(MemoryResult::new(records()))).unwrap();
        assert_eq!(set.count().unwrap(), 2);
        assert_eq!(set.raw_result().unwrap().row_count().unwrap(), 2);
    }

    #[test]
    fn test_records_and_objects_are_index_aligned() {
        let mut set = result_set();
        set.initialize(Box::new(MemoryResult::new(records()))).unwrap();

        assert_eq!(set.len(), set.records().len());
        for (index, object) in set.iter() {
            let record = &set.records()[index];
            assert_eq!(Some(&json!(object.id)), record.get("id"));
        }
    }

    #[test]
    fn test_iter_does_not_move_cursor() {
        let mut set = result_set();
        set.initialize(Box::new(MemoryResult::new(records()))).unwrap();
        set.next();

        let names: Vec<_> = (&set).into_iter().map(|(_, row)| row.name.clone()).collect();
        assert_eq!(names, vec!["Foo", "Bar"]);
        assert_eq!(set.key(), Some(1));
    }

    #[test]
    fn test_hydration_failure_leaves_set_uninitialized() {
        let failing = |record: &Record, row: Row| -> Result<Row, HydrationError> {
            if record.get("id") == Some(&json!(456)) {
                return Err(HydrationError::new("bad row"));
            }
            Ok(row)
        };
        let mut set = HydratingResultSet::new(failing, Row::default());

        let err = set.initialize(Box::new(MemoryResult::new(records()))).unwrap_err();
        assert!(matches!(err, ResultSetError::HydrationFailed { index: 1, .. }));
        assert!(!set.is_initialized());
        assert!(set.is_empty());
    }

    #[test]
    fn test_fetch_failure_leaves_set_uninitialized() {
        let mut set = result_set();
        let err = set
            .initialize(Box::new(MemoryResult::failing(LifeError::QueryError("driver gone".to_string()))))
            .unwrap_err();

        assert!(matches!(err, ResultSetError::FetchFailed { .. }));
        assert!(err.to_string().contains("driver gone"));
        assert!(!set.is_initialized());
        assert!(matches!(set.count(), Err(ResultSetError::NotInitialized)));
    }

    #[test]
    fn test_fresh_copy_is_uninitialized_and_shares_hydrator() {
        let mut set = result_set();
        set.initialize(Box::new(MemoryResult::new(records()))).unwrap();

        let copy = set.fresh();
        assert!(!copy.is_initialized());
        assert!(Arc::ptr_eq(&set.hydrator, &copy.hydrator));
        assert_eq!(copy.prototype(), set.prototype());
    }

    #[test]
    fn test_debug_output() {
        let set = result_set();
        let debug = format!("{set:?}");
        assert!(debug.contains("initialized: false"));
    }
}
