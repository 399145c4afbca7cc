//! In-memory executor and raw result.
//!
//! [`MemoryExecutor`] hands out queued results in FIFO order and records every
//! request it receives, which makes gateways and result sets testable without
//! a database.

use crate::executor::{LifeError, LifeExecutor, RawResult};
use crate::query::QueryRequest;
use crate::record::Record;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Raw result over records held in memory
///
/// Like a database result, the row count stays available after the rows have
/// been fetched.
#[derive(Debug)]
pub struct MemoryResult {
    rows: Option<Vec<Record>>,
    row_count: Option<u64>,
    fetch_error: Option<LifeError>,
}

impl MemoryResult {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            row_count: Some(rows.len() as u64),
            rows: Some(rows),
            fetch_error: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A result whose fetch fails with `error`
    pub fn failing(error: LifeError) -> Self {
        Self {
            rows: None,
            row_count: None,
            fetch_error: Some(error),
        }
    }

    /// Report `count` from `row_count` instead of the number of rows
    pub fn with_row_count(mut self, count: u64) -> Self {
        self.row_count = Some(count);
        self
    }
}

impl RawResult for MemoryResult {
    fn fetch_all_rows(&mut self) -> Result<Vec<Record>, LifeError> {
        if let Some(error) = self.fetch_error.take() {
            return Err(error);
        }
        self.rows
            .take()
            .ok_or_else(|| LifeError::QueryError("Rows have already been fetched from this result".to_string()))
    }

    fn row_count(&self) -> Result<u64, LifeError> {
        self.row_count
            .ok_or_else(|| LifeError::QueryError("Row count is not available".to_string()))
    }
}

/// Executor answering queries from a queue of prepared results
pub struct MemoryExecutor {
    results_tx: Sender<Result<MemoryResult, LifeError>>,
    results_rx: Receiver<Result<MemoryResult, LifeError>>,
    requests_tx: Sender<QueryRequest>,
    requests_rx: Receiver<QueryRequest>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        let (results_tx, results_rx) = unbounded();
        let (requests_tx, requests_rx) = unbounded();
        Self {
            results_tx,
            results_rx,
            requests_tx,
            requests_rx,
        }
    }

    /// Queue the result for the next unanswered query
    pub fn push_result(&self, result: MemoryResult) {
        // both ends live in self, the channel cannot be disconnected
        let _ = self.results_tx.send(Ok(result));
    }

    /// Queue an error for the next unanswered query
    pub fn push_error(&self, error: LifeError) {
        let _ = self.results_tx.send(Err(error));
    }

    /// Number of queued answers not yet consumed
    pub fn pending(&self) -> usize {
        self.results_rx.len()
    }

    /// Drain the requests received since the last call
    pub fn executed_requests(&self) -> Vec<QueryRequest> {
        self.requests_rx.try_iter().collect()
    }
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LifeExecutor for MemoryExecutor {
    fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn RawResult>, LifeError> {
        log::debug!("memory executor received query: {}", request.sql);
        let _ = self.requests_tx.send(request.clone());

        match self.results_rx.try_recv() {
            Ok(Ok(result)) => Ok(Box::new(result)),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(LifeError::QueryError(format!(
                "No result queued for query: {}",
                request.sql
            ))),
        }
    }
}
