//! Error types for the access layer
//!
//! Every failure a caller can observe is a [`DbError`]. Raw driver failures
//! never leave the crate untranslated; the executor wraps them together with
//! the offending SQL so the statement that failed is always visible in the
//! message.

use thiserror::Error;

/// Errors surfaced by the database access layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection establishment, database selection, or liveness failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Null or empty statement text was supplied. Programming error.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The driver reported a failure executing a statement.
    ///
    /// Carries the driver's message with the offending SQL appended for
    /// diagnostics.
    #[error("{message}\n\nQUERY: {sql}")]
    Query {
        /// The driver's error message
        message: String,
        /// The statement that failed
        sql: String,
    },

    /// The installation-readiness probe failed.
    ///
    /// Distinct from [`DbError::Query`] so callers can tell "not yet
    /// installed" apart from a broken query.
    #[error("installation error: {0}")]
    Installation(String),

    /// One or more statements of a schema script failed.
    ///
    /// The runner attempts every statement before raising; the individual
    /// failure messages are collected here in script order.
    #[error("schema script produced {} error(s): {}", .0.len(), .0.join("; "))]
    Script(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_appends_sql() {
        let err = DbError::Query {
            message: "syntax error near 'FORM'".to_string(),
            sql: "SELECT * FORM users".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("syntax error near 'FORM'"));
        assert!(text.contains("QUERY: SELECT * FORM users"));
    }

    #[test]
    fn test_script_error_counts_failures() {
        let err = DbError::Script(vec!["first".to_string(), "second".to_string()]);
        let text = err.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("first; second"));
    }
}
