//! Gateway Module
//!
//! The gateway joins a query executor and a result set prototype: each call
//! runs one query and hands back a freshly initialized copy of the prototype.

use crate::executor::{LifeError, LifeExecutor};
use crate::query::{Params, ParamTypes, QueryCacheProfile, QueryRequest};
use crate::result_set::ResultSetTrait;

/// Executes queries and wraps their results in hydrated result sets
///
/// The prototype itself is never initialized; every call works on its own
/// [`ResultSetTrait::fresh`] copy, so result sets returned by earlier calls
/// are unaffected by later ones.
///
/// # Examples
///
/// ```
/// use lifeguard_hydrator::{
///     Gateway, HydratingResultSet, MemoryExecutor, MemoryResult, Params, Record, ResultSetTrait,
///     SerdeHydrator,
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
/// let executor = MemoryExecutor::new();
/// executor.push_result(MemoryResult::new(vec![
///     Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
/// ]));
///
/// let gateway = Gateway::new(
///     executor,
///     HydratingResultSet::new(SerdeHydrator::new(), User::default()),
/// );
///
/// let mut users = gateway
///     .execute_query("SELECT id, name FROM users WHERE id = :id", Params::named([("id", 123)]), None, None)
///     .unwrap();
/// assert_eq!(users.current().unwrap().name, "Foo");
/// ```
pub struct Gateway<E, S> {
    executor: E,
    prototype: S,
}

impl<E, S> Gateway<E, S>
where
    E: LifeExecutor,
    S: ResultSetTrait,
{
    pub fn new(executor: E, prototype: S) -> Self {
        Self { executor, prototype }
    }

    /// Run `sql` and return a new initialized result set
    ///
    /// # Errors
    ///
    /// Returns the executor's `LifeError` unchanged if the query fails, or
    /// `LifeError::ResultSet` if the result cannot be materialized.
    pub fn execute_query(
        &self,
        sql: &str,
        params: Params,
        types: Option<ParamTypes>,
        cache_profile: Option<QueryCacheProfile>,
    ) -> Result<S, LifeError> {
        let mut request = QueryRequest::new(sql).with_params(params);
        if let Some(types) = types {
            request = request.with_types(types);
        }
        if let Some(profile) = cache_profile {
            request = request.with_cache_profile(profile);
        }
        self.execute(&request)
    }

    /// Run a prepared request and return a new initialized result set
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::execute_query`].
    pub fn execute(&self, request: &QueryRequest) -> Result<S, LifeError> {
        let raw = self.executor.execute_query(request)?;

        let mut result_set = self.prototype.fresh();
        result_set.initialize(raw)?;
        Ok(result_set)
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The uninitialized result set every call is copied from
    pub fn prototype(&self) -> &S {
        &self.prototype
    }

    pub fn into_parts(self) -> (E, S) {
        (self.executor, self.prototype)
    }
}
