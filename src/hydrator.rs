//! Hydration strategies.
//!
//! A [`Hydrator`] populates an object from a [`Record`]. The result set clones
//! its object prototype once per row and hands the clone to the hydrator, so a
//! hydrator only ever sees a fresh object.
//!
//! Two strategies ship with the crate:
//! - any `Fn(&Record, T) -> Result<T, HydrationError>` closure
//! - [`SerdeHydrator`], which overlays the row's columns onto the serialized
//!   prototype and deserializes the result

use crate::record::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Error raised by a hydrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationError {
    message: String,
}

impl HydrationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HydrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hydration failed: {}", self.message)
    }
}

impl std::error::Error for HydrationError {}

impl From<serde_json::Error> for HydrationError {
    fn from(err: serde_json::Error) -> Self {
        HydrationError::new(err.to_string())
    }
}

/// Populates objects of type `T` from records
///
/// # Examples
///
/// ```
/// use lifeguard_hydrator::{HydrationError, Hydrator, Record};
///
/// #[derive(Clone, Default)]
/// struct User {
///     id: i64,
/// }
///
/// let hydrator = |record: &Record, mut user: User| -> Result<User, HydrationError> {
///     user.id = record
///         .get("id")
///         .and_then(|v| v.as_i64())
///         .ok_or_else(|| HydrationError::new("id is not an integer"))?;
///     Ok(user)
/// };
///
/// let record: Record = [("id", 7)].into_iter().collect();
/// assert_eq!(hydrator.hydrate(&record, User::default()).unwrap().id, 7);
/// ```
pub trait Hydrator<T>: Send + Sync {
    /// Populate `target` from `record` and return it
    ///
    /// # Errors
    ///
    /// Returns `HydrationError` if the record cannot be applied to the object.
    fn hydrate(&self, record: &Record, target: T) -> Result<T, HydrationError>;
}

impl<T, F> Hydrator<T> for F
where
    F: Fn(&Record, T) -> Result<T, HydrationError> + Send + Sync,
{
    fn hydrate(&self, record: &Record, target: T) -> Result<T, HydrationError> {
        self(record, target)
    }
}

/// Serde-based hydrator
///
/// The prototype is serialized to a JSON object, every column of the row is
/// written over the field with the same name (or the field it was renamed to)
/// and the object is deserialized back. Fields the row does not mention keep
/// the prototype's value; columns without a matching field are passed through
/// and are ignored by the default serde behaviour.
///
/// # Examples
///
/// ```
/// use lifeguard_hydrator::{Hydrator, Record, SerdeHydrator};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Default, Serialize, Deserialize)]
/// struct User {
///     id: i64,
///     display_name: String,
///     active: bool,
/// }
///
/// let hydrator = SerdeHydrator::<User>::new().rename("name", "display_name");
/// let record: Record = [("id", serde_json::json!(1)), ("name", serde_json::json!("Foo"))]
///     .into_iter()
///     .collect();
///
/// let prototype = User { active: true, ..User::default() };
/// let user = hydrator.hydrate(&record, prototype).unwrap();
/// assert_eq!(user.display_name, "Foo");
/// assert!(user.active);
/// ```
pub struct SerdeHydrator<T> {
    renames: BTreeMap<String, String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeHydrator<T> {
    pub fn new() -> Self {
        Self {
            renames: BTreeMap::new(),
            _marker: PhantomData,
        }
    }

    /// Write `column` into the object field `field`
    pub fn rename(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.renames.insert(column.into(), field.into());
        self
    }

    fn field_for<'a>(&'a self, column: &'a str) -> &'a str {
        self.renames.get(column).map_or(column, String::as_str)
    }
}

impl<T> Default for SerdeHydrator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeHydrator<T> {
    fn clone(&self) -> Self {
        Self {
            renames: self.renames.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SerdeHydrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeHydrator")
            .field("renames", &self.renames)
            .finish()
    }
}

impl<T> Hydrator<T> for SerdeHydrator<T>
where
    T: Serialize + DeserializeOwned,
{
    fn hydrate(&self, record: &Record, target: T) -> Result<T, HydrationError> {
        let mut object = match serde_json::to_value(&target)? {
            Value::Object(map) => map,
            other => {
                return Err(HydrationError::new(format!(
                    "prototype must serialize to an object, got {other}"
                )))
            }
        };

        for (column, value) in record {
            object.insert(self.field_for(column).to_string(), value.clone());
        }

        Ok(serde_json::from_value(Value::Object(object))?)
    }
}
