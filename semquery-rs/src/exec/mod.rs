//! Execution of compiled SQL against the host engine
//!
//! The semantic layer never executes SQL itself. Anything that can run a
//! statement and hand back rows implements [`Executor`]; errors it returns
//! are propagated to the caller unchanged.
//!
//! ```rust,ignore
//! use semquery::exec::{Executor, QueryResult};
//!
//! let executor = |sql: &str| -> Result<QueryResult, semquery::BoxError> {
//!     my_engine.run(sql)
//! };
//! ```

#[cfg(feature = "duckdb")]
pub mod duckdb;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbExecutor;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BoxError;

/// Tabular result: column names plus rows of JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Single-row, single-column result holding the compiled SQL text
    pub fn explain(sql: impl Into<String>) -> Self {
        Self {
            columns: vec!["compiled_sql".to_string()],
            rows: vec![vec![Value::String(sql.into())]],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Trait for SQL execution engines
pub trait Executor {
    /// Execute a SQL statement and return its rows
    ///
    /// # Errors
    ///
    /// Whatever the engine reports (bad SQL, missing table, I/O). The
    /// semantic layer wraps it without altering the message.
    fn execute(&self, sql: &str) -> Result<QueryResult, BoxError>;
}

impl<F> Executor for F
where
    F: Fn(&str) -> Result<QueryResult, BoxError>,
{
    fn execute(&self, sql: &str) -> Result<QueryResult, BoxError> {
        self(sql)
    }
}
