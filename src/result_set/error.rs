//! Error types for result set operations.

use crate::executor::LifeError;
use crate::hydrator::HydrationError;

/// Error type for result set operations
#[derive(Debug)]
pub enum ResultSetError {
    /// `initialize` was called on a result set that already holds a result
    AlreadyInitialized,
    /// The result set was used before `initialize`
    NotInitialized,
    /// The raw result could not deliver its rows or row count
    FetchFailed { source: Box<LifeError> },
    /// The hydrator rejected a row
    HydrationFailed { index: usize, source: HydrationError },
    /// The key column requested for flattening is not part of a row
    MissingKeyField { field: String, index: usize },
    /// A derived key has an empty textual form
    EmptyKey { strategy: String, index: usize },
}

impl ResultSetError {
    pub(crate) fn fetch_failed(source: LifeError) -> Self {
        ResultSetError::FetchFailed {
            source: Box::new(source),
        }
    }
}

impl std::fmt::Display for ResultSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSetError::AlreadyInitialized => write!(f, "Result set already initialized"),
            ResultSetError::NotInitialized => write!(f, "Result set not initialized"),
            ResultSetError::FetchFailed { source } => {
                write!(f, "Failed to fetch rows from result: {}", source)
            }
            ResultSetError::HydrationFailed { index, source } => {
                write!(f, "Failed to hydrate row {}: {}", index, source)
            }
            ResultSetError::MissingKeyField { field, index } => {
                write!(f, "Result set key \"{}\" does not exist in row {}", field, index)
            }
            ResultSetError::EmptyKey { strategy, index } => {
                write!(f, "Result set key \"{}\" is empty in row {}", strategy, index)
            }
        }
    }
}

impl std::error::Error for ResultSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResultSetError::FetchFailed { source } => Some(source.as_ref()),
            ResultSetError::HydrationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
