//! Statement execution
//!
//! Every statement the layer sends to the database funnels through
//! [`QueryExecutor::execute`]: one choke point for precondition checks, the
//! statement counter, and translation of driver failures into [`DbError`].
//! No retries happen here; every failure propagates to the caller.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::driver::{DriverConnection, RawResult};
use crate::error::DbError;

/// Executes statements against connection handles and counts them.
#[derive(Debug, Default)]
pub struct QueryExecutor {
    /// Statements actually sent to the database. Cache hits never pass
    /// through here, so they are never counted.
    count: AtomicU64,
}

impl QueryExecutor {
    /// Create an executor with a zeroed counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one SQL statement against the given handle.
    ///
    /// Blank SQL fails with [`DbError::InvalidQuery`] and a dead handle with
    /// [`DbError::Connection`], both without touching the counter. Once the
    /// statement is sent the counter is incremented, before the outcome is
    /// known; a driver failure then becomes [`DbError::Query`] carrying the
    /// driver's message and the offending SQL.
    pub fn execute(
        &self,
        sql: &str,
        conn: &mut dyn DriverConnection,
    ) -> Result<RawResult, DbError> {
        if sql.trim().is_empty() {
            return Err(DbError::InvalidQuery("query cannot be empty".to_string()));
        }
        if !conn.is_alive() {
            return Err(DbError::Connection(
                "connection to database was lost".to_string(),
            ));
        }

        self.count.fetch_add(1, Ordering::Relaxed);
        debug!(%sql, "DB query");

        conn.execute(sql).map_err(|e| DbError::Query {
            message: e.message,
            sql: sql.to_string(),
        })
    }

    /// Number of statements sent so far
    pub fn query_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
