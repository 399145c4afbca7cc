//! Result sets: materialized, cursor-iterated, keyable collections of hydrated objects.
//!
//! A result set is built once as a prototype (hydrator + object prototype),
//! copied with [`ResultSetTrait::fresh`] for every executed query and
//! initialized exactly once with the query's [`RawResult`]:
//!
//! ```text
//! Uninitialized --initialize(raw)--> Initialized
//! ```
//!
//! Initialization fetches every row and hydrates every object up front; the
//! cursor then walks the prebuilt sequence.

mod error;
mod hydrating;
mod keyed;

pub use error::ResultSetError;
pub use hydrating::{HydratingResultSet, Objects};
pub use keyed::{KeyStrategy, KeyedObjects};

use crate::executor::RawResult;
use std::sync::Arc;

/// Contract of a hydrated result set
///
/// The cursor methods (`rewind`, `next`, `current`, `valid`, `key`) share one
/// traversal position per instance; `to_map` walks the same cursor.
///
/// # Example
///
/// ```
/// use lifeguard_hydrator::{
///     HydratingResultSet, KeyStrategy, MemoryResult, Record, ResultSetTrait, SerdeHydrator,
/// };
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// let rows = vec![
///     Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
///     Record::try_from(json!({"id": 456, "name": "Bar"})).unwrap(),
/// ];
///
/// let mut users = HydratingResultSet::new(SerdeHydrator::new(), User::default());
/// users.initialize(Box::new(MemoryResult::new(rows))).unwrap();
///
/// users.rewind();
/// while let Some(user) = users.current() {
///     println!("{} => {}", users.key().unwrap(), user.name);
///     users.next();
/// }
///
/// let by_id = users.to_map(KeyStrategy::field("id")).unwrap();
/// assert_eq!(by_id.get("456").unwrap().name, "Bar");
/// ```
pub trait ResultSetTrait {
    /// The hydrated object type
    type Object;

    /// A new, uninitialized result set configured like this one
    fn fresh(&self) -> Self
    where
        Self: Sized;

    /// Fetch and hydrate every row of `result`
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` if called a second time; nothing changes
    /// - `FetchFailed` if the rows cannot be fetched; the set stays uninitialized
    /// - `HydrationFailed` if a row cannot be hydrated; the set stays uninitialized
    fn initialize(&mut self, result: Box<dyn RawResult>) -> Result<(), ResultSetError>;

    fn is_initialized(&self) -> bool;

    /// The raw result this set was initialized with
    fn raw_result(&self) -> Option<&dyn RawResult>;

    /// Row count as reported by the raw result
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before initialization, or `FetchFailed` if the
    /// raw result cannot report its row count.
    fn count(&self) -> Result<u64, ResultSetError>;

    /// Move the cursor to the first object
    fn rewind(&mut self);

    /// Advance the cursor by one
    fn next(&mut self);

    /// Object under the cursor, `None` once the cursor is past the end
    fn current(&self) -> Option<Arc<Self::Object>>;

    /// Index under the cursor, `None` once the cursor is past the end
    fn key(&self) -> Option<usize>;

    fn valid(&self) -> bool {
        self.current().is_some()
    }

    /// Flatten into a mapping from derived key to object
    ///
    /// Rewinds the cursor and walks it to the end. A later object whose key
    /// equals an earlier one replaces it.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before initialization
    /// - `MissingKeyField` if a row lacks the key column
    /// - `EmptyKey` if a key's textual form is empty (including `NULL`)
    fn to_map(
        &mut self,
        strategy: KeyStrategy<'_, Self::Object>,
    ) -> Result<KeyedObjects<Arc<Self::Object>>, ResultSetError>;
}
