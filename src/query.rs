//! Query requests.
//!
//! A [`QueryRequest`] bundles everything a [`LifeExecutor`](crate::LifeExecutor)
//! needs to run one statement: the SQL text, positional or named bind values,
//! per-parameter type hints and an optional cache profile.
//!
//! Named parameters (`:name`) are rewritten to PostgreSQL positional
//! placeholders (`$1`, `$2`, ...) by [`QueryRequest::to_positional`].

use crate::executor::LifeError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Identifies a bind parameter: zero-based position or name (without the leading `:`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ParamKey {
    fn from(index: usize) -> Self {
        ParamKey::Index(index)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.trim_start_matches(':').to_string())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::from(name.as_str())
    }
}

/// Type hint for a bind parameter
///
/// Without a hint the database type is inferred from the JSON value
/// (see [`crate::value_conversion`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Text,
    Json,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Bytea,
}

/// Per-parameter type hints
pub type ParamTypes = BTreeMap<ParamKey, ParamType>;

/// Bind values for a query
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Values for `$1`, `$2`, ... in order
    Positional(Vec<Value>),
    /// Values for `:name` placeholders
    Named(BTreeMap<String, Value>),
}

impl Params {
    pub fn none() -> Self {
        Params::default()
    }

    pub fn positional<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<K, V, I>(values: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Params::Named(
            values
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::Positional(values) => values.is_empty(),
            Params::Named(values) => values.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Params::Named(values)
    }
}

/// Cache profile handed through to the executor untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCacheProfile {
    pub lifetime: Duration,
    pub cache_key: Option<String>,
}

impl QueryCacheProfile {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            cache_key: None,
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// A statement ready for execution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub sql: String,
    pub params: Params,
    pub types: ParamTypes,
    pub cache_profile: Option<QueryCacheProfile>,
}

/// A positional bind value with its resolved type hint
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub value: Value,
    pub hint: Option<ParamType>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_types(mut self, types: ParamTypes) -> Self {
        self.types = types;
        self
    }

    /// Append a positional value
    ///
    /// Switches a request holding named parameters back to positional ones.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        match &mut self.params {
            Params::Positional(values) => values.push(value.into()),
            Params::Named(_) => self.params = Params::Positional(vec![value.into()]),
        }
        self
    }

    /// Set a named value (`:name`); the leading colon is optional
    pub fn bind_named(mut self, name: &str, value: impl Into<Value>) -> Self {
        let name = name.trim_start_matches(':').to_string();
        match &mut self.params {
            Params::Named(values) => {
                values.insert(name, value.into());
            }
            Params::Positional(_) => {
                self.params = Params::Named(BTreeMap::from([(name, value.into())]));
            }
        }
        self
    }

    pub fn with_type(mut self, key: impl Into<ParamKey>, param_type: ParamType) -> Self {
        self.types.insert(key.into(), param_type);
        self
    }

    pub fn with_cache_profile(mut self, profile: QueryCacheProfile) -> Self {
        self.cache_profile = Some(profile);
        self
    }

    /// Resolve the request into positional SQL and bind values
    ///
    /// Named requests are rewritten so each distinct `:name` becomes one `$n`
    /// placeholder, numbered by first appearance.
    ///
    /// # Errors
    ///
    /// Returns `LifeError::QueryError` if the SQL references a named parameter
    /// that has no value.
    pub fn to_positional(&self) -> Result<(String, Vec<BoundParam>), LifeError> {
        match &self.params {
            Params::Positional(values) => {
                let bound = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| BoundParam {
                        value: value.clone(),
                        hint: self.types.get(&ParamKey::Index(index)).copied(),
                    })
                    .collect();
                Ok((self.sql.clone(), bound))
            }
            Params::Named(values) => {
                let (sql, names) = expand_named_params(&self.sql);
                let mut bound = Vec::with_capacity(names.len());
                for (index, name) in names.iter().enumerate() {
                    let value = values.get(name).ok_or_else(|| {
                        LifeError::QueryError(format!("Missing value for named parameter :{name}"))
                    })?;
                    let hint = self
                        .types
                        .get(&ParamKey::Name(name.clone()))
                        .or_else(|| self.types.get(&ParamKey::Index(index)))
                        .copied();
                    bound.push(BoundParam {
                        value: value.clone(),
                        hint,
                    });
                }
                Ok((sql, bound))
            }
        }
    }
}

/// Rewrite `:name` placeholders to `$n`.
///
/// Returns the rewritten SQL and the parameter names in placeholder order.
/// Text inside single quotes, double-quoted identifiers, `--` line comments
/// and `/* */` block comments is copied verbatim, as are `::` casts.
pub fn expand_named_params(sql: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = find_closing(&chars, i + 1, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |offset| i + offset);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = chars[i + 2..]
                    .windows(2)
                    .position(|w| w == ['*', '/'])
                    .map_or(chars.len(), |offset| i + 2 + offset + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|ch| ch.is_ascii_alphabetic() || *ch == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let position = match names.iter().position(|n| *n == name) {
                    Some(existing) => existing,
                    None => {
                        names.push(name);
                        names.len() - 1
                    }
                };
                out.push('$');
                out.push_str(&(position + 1).to_string());
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    (out, names)
}

/// Index just past the closing quote, treating a doubled quote as an escape
fn find_closing(chars: &[char], mut i: usize, quote: char) -> usize {
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}
