//! The raw SQL driver boundary
//!
//! The access layer does not speak any wire protocol itself. It is written
//! against the two traits in this module, which the embedding application
//! implements for its driver of choice. The contract is deliberately small:
//! connect, select a database, execute one statement, report liveness.
//!
//! Rows are JSON objects (`serde_json::Value`), one per result row, keyed by
//! column name. Statement metadata (`last_insert_id`, `rows_affected`) rides
//! alongside the rows in [`RawResult`].

use serde_json::Value;
use thiserror::Error;

/// A failure reported by the underlying driver.
///
/// Always translated into a typed [`DbError`](crate::DbError) before it
/// reaches a caller of the access layer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    /// The driver's error message
    pub message: String,
}

impl DriverError {
    /// Create a new driver error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The raw result of executing one statement.
#[derive(Debug, Clone, Default)]
pub struct RawResult {
    /// Result rows, each a JSON object keyed by column name.
    ///
    /// Empty for statements that return no rows.
    pub rows: Vec<Value>,
    /// Identifier generated by the statement, when the target table has an
    /// auto-generated key. `None` when it does not.
    pub last_insert_id: Option<u64>,
    /// Number of rows the statement affected.
    pub rows_affected: u64,
}

/// An open session against one database endpoint.
///
/// Handles are owned exclusively by the
/// [`ConnectionRouter`](crate::ConnectionRouter); they are never cloned or
/// shared, and are closed by dropping at the end of the unit of work.
pub trait DriverConnection: std::fmt::Debug {
    /// Select the target database for this session.
    fn select_database(&mut self, name: &str) -> Result<(), DriverError>;

    /// Execute one SQL statement and return its raw result.
    fn execute(&mut self, sql: &str) -> Result<RawResult, DriverError>;

    /// Whether the session is still usable.
    fn is_alive(&self) -> bool;
}

/// Factory for [`DriverConnection`] sessions.
pub trait SqlDriver {
    /// Open a session against the given endpoint.
    fn connect(
        &self,
        host: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn DriverConnection>, DriverError>;
}
