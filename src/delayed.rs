//! Delayed query queue
//!
//! Queries registered here are held until the end of the unit of work and
//! flushed as a batch, in registration order. By flush time the code that
//! registered an entry may already be done, so nothing can observe a raised
//! error: per-entry failures are logged and suppressed without aborting the
//! remaining entries, and `flush` itself never fails.

use std::fmt;

use tracing::{error, warn};

use crate::driver::RawResult;
use crate::executor::QueryExecutor;
use crate::router::{ConnectionRouter, Role};

/// Callback invoked with the raw result of a successfully executed delayed
/// query.
pub type DelayedHandler = Box<dyn FnOnce(&RawResult)>;

struct DelayedQuery {
    sql: String,
    role: Role,
    handler: Option<DelayedHandler>,
}

/// FIFO queue of queries deferred until end-of-work.
#[derive(Default)]
pub struct DelayedQueryQueue {
    entries: Vec<DelayedQuery>,
}

impl fmt::Debug for DelayedQueryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedQueryQueue")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl DelayedQueryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query for execution at flush time.
    ///
    /// Only the `Read` and `Write` roles are registrable; anything else is a
    /// registration error and returns `false` without queueing.
    pub fn register(&mut self, sql: impl Into<String>, role: Role) -> bool {
        self.push(sql.into(), role, None)
    }

    /// Register a query together with a handler for its raw result.
    ///
    /// The handler runs only if the query executes successfully.
    pub fn register_with_handler(
        &mut self,
        sql: impl Into<String>,
        role: Role,
        handler: impl FnOnce(&RawResult) + 'static,
    ) -> bool {
        self.push(sql.into(), role, Some(Box::new(handler)))
    }

    fn push(&mut self, sql: String, role: Role, handler: Option<DelayedHandler>) -> bool {
        if role == Role::ReadWrite {
            warn!(%sql, %role, "delayed query rejected: role must be read or write");
            return false;
        }
        self.entries.push(DelayedQuery { sql, role, handler });
        true
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute every queued entry in registration order, then leave the
    /// queue empty.
    ///
    /// A failure to resolve a connection or execute a statement is logged
    /// and suppressed; it neither aborts the remaining entries nor escapes
    /// this method.
    pub fn flush(&mut self, router: &mut ConnectionRouter, executor: &QueryExecutor) {
        for entry in self.entries.drain(..) {
            let conn = match router.resolve(entry.role) {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, sql = %entry.sql, "delayed query skipped: no connection");
                    continue;
                }
            };
            match executor.execute(&entry.sql, conn) {
                Ok(result) => {
                    if let Some(handler) = entry.handler {
                        handler(&result);
                    }
                }
                Err(e) => {
                    error!(error = %e, sql = %entry.sql, "delayed query failed");
                }
            }
        }
    }
}
