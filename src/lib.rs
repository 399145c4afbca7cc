//! # Lifeguard Hydrator
//!
//! Hydrated result sets over `may_postgres` queries.
//!
//! A [`Gateway`] runs a query through a [`LifeExecutor`] and wraps the raw
//! result in a fresh copy of a result set prototype. A
//! [`HydratingResultSet`] fetches every row as a [`Record`], hands each one
//! to a [`Hydrator`] together with a clone of an object prototype, and then
//! exposes the objects through a rewindable cursor or flattens them into a
//! keyed map with [`ResultSetTrait::to_map`].
//!
//! ```
//! use lifeguard_hydrator::{
//!     Gateway, HydratingResultSet, KeyStrategy, MemoryExecutor, MemoryResult, Params, Record,
//!     ResultSetTrait, SerdeHydrator,
//! };
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! # fn main() -> Result<(), lifeguard_hydrator::LifeError> {
//! let executor = MemoryExecutor::new();
//! executor.push_result(MemoryResult::new(vec![
//!     Record::try_from(json!({"id": 123, "name": "Foo"})).unwrap(),
//!     Record::try_from(json!({"id": 456, "name": "Bar"})).unwrap(),
//! ]));
//!
//! let gateway = Gateway::new(
//!     executor,
//!     HydratingResultSet::new(SerdeHydrator::new(), User::default()),
//! );
//! let mut users = gateway.execute_query("SELECT id, name FROM users", Params::none(), None, None)?;
//!
//! assert_eq!(users.count()?, 2);
//! let by_name = users.to_map(KeyStrategy::derived(|user: &User| user.name.clone()))?;
//! assert_eq!(by_name.get("Foo").unwrap().id, 123);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod executor;
pub mod gateway;
pub mod hydrator;
#[cfg(feature = "tracing")]
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod query;
pub mod raw_sql;
pub mod record;
pub mod result_set;
pub mod value_conversion;

pub use config::DatabaseConfig;
pub use connection::{connect, connect_with_config, validate_connection_string, ConnectionError};
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor, PgResult, RawResult};
pub use gateway::Gateway;
pub use hydrator::{HydrationError, Hydrator, SerdeHydrator};
pub use memory::{MemoryExecutor, MemoryResult};
pub use query::{
    expand_named_params, ParamKey, ParamType, ParamTypes, Params, QueryCacheProfile, QueryRequest,
};
pub use raw_sql::{find_all_by_statement, find_by_statement, query_value};
pub use record::{key_text, Record};
pub use result_set::{
    HydratingResultSet, KeyStrategy, KeyedObjects, Objects, ResultSetError, ResultSetTrait,
};
