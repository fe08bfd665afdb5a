//! The database facade
//!
//! [`Database`] composes the router, executor, result cache, and delayed
//! queue into the public access layer for one unit of work. Reads consult
//! the cache and store their shaped results; every write invalidates the
//! whole cache before it is issued; deferred work drains through
//! [`Database::flush_delayed`] at end-of-work.
//!
//! One instance serves one unit of work; connections, cache, and queue all
//! live and die with it. There is no process-wide shared state.
//!
//! # Example
//!
//! ```ignore
//! use splitdb::{Database, DatabaseConfig, Role};
//!
//! let config = DatabaseConfig::new("db.internal", "app", "secret", "app_db")
//!     .with_table_prefix("app_");
//! let mut db = Database::new(config, Box::new(MyDriver::new()));
//!
//! let users = db.fetch_all("SELECT id, name FROM app_users")?;
//! let id = db.insert("INSERT INTO app_users (name) VALUES ('ada')")?;
//! db.register_delayed("UPDATE app_stats SET hits = hits + 1", Role::Write);
//! db.flush_delayed();
//! ```

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheKey, CacheStats, CachedValue, QueryCache};
use crate::config::DatabaseConfig;
use crate::delayed::DelayedQueryQueue;
use crate::driver::{RawResult, SqlDriver};
use crate::error::DbError;
use crate::executor::QueryExecutor;
use crate::router::{ConnectionRouter, Role};
use crate::shape::RowShaper;

/// Placeholder substituted with the configured table prefix in schema
/// scripts.
const PREFIX_PLACEHOLDER: &str = "prefix_";

/// Database access layer for one unit of work.
pub struct Database {
    router: ConnectionRouter,
    executor: QueryExecutor,
    cache: QueryCache,
    delayed: DelayedQueryQueue,
    table_prefix: String,
    /// Computed once on first success and never refreshed
    tables: Option<Vec<String>>,
    /// Set once the installation probe has succeeded
    installed: bool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("router", &self.router)
            .field("cache", &self.cache)
            .field("delayed", &self.delayed)
            .field("query_count", &self.query_count())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create an access layer over the given driver.
    ///
    /// No connection is opened until the first operation needs one.
    pub fn new(config: DatabaseConfig, driver: Box<dyn SqlDriver>) -> Self {
        let table_prefix = config.table_prefix().to_string();
        let cache = QueryCache::new(config.cache());
        Self {
            router: ConnectionRouter::new(config, driver),
            executor: QueryExecutor::new(),
            cache,
            delayed: DelayedQueryQueue::new(),
            table_prefix,
            tables: None,
            installed: false,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Retrieve all rows matched by a select statement.
    ///
    /// Returns an empty vector when the query matches nothing. Results are
    /// cached; a repeat of the same statement is served without a round
    /// trip.
    pub fn fetch_all(&mut self, sql: &str) -> Result<Vec<Value>, DbError> {
        self.read_many(sql, None)
    }

    /// Like [`fetch_all`](Self::fetch_all), with each row passed through the
    /// given shaper before it is returned or cached.
    pub fn fetch_all_shaped(
        &mut self,
        sql: &str,
        shaper: &RowShaper,
    ) -> Result<Vec<Value>, DbError> {
        self.read_many(sql, Some(shaper))
    }

    /// Retrieve the first row matched by a select statement, or `None` when
    /// the query matches nothing.
    ///
    /// The zero-row outcome is cached like any other result.
    pub fn fetch_one(&mut self, sql: &str) -> Result<Option<Value>, DbError> {
        self.read_one(sql, None)
    }

    /// Like [`fetch_one`](Self::fetch_one), with the row passed through the
    /// given shaper before it is returned or cached.
    pub fn fetch_one_shaped(
        &mut self,
        sql: &str,
        shaper: &RowShaper,
    ) -> Result<Option<Value>, DbError> {
        self.read_one(sql, Some(shaper))
    }

    fn read_many(&mut self, sql: &str, shaper: Option<&RowShaper>) -> Result<Vec<Value>, DbError> {
        let key = CacheKey::new(shaper.map(RowShaper::token), false, sql);
        if let Some(CachedValue::Rows(rows)) = self.cache.lookup(&key) {
            debug!(%sql, "query results returned from cache");
            return Ok(rows);
        }

        let raw = self.execute_read(sql)?;
        let rows: Vec<Value> = raw
            .rows
            .into_iter()
            .map(|row| shape_row(shaper, row))
            .collect();
        if rows.is_empty() {
            debug!(%sql, "query returned no results");
        }
        self.cache.store(key, CachedValue::Rows(rows.clone()));
        Ok(rows)
    }

    fn read_one(&mut self, sql: &str, shaper: Option<&RowShaper>) -> Result<Option<Value>, DbError> {
        let key = CacheKey::new(shaper.map(RowShaper::token), true, sql);
        if let Some(CachedValue::Row(row)) = self.cache.lookup(&key) {
            debug!(%sql, "query result returned from cache");
            return Ok(row);
        }

        let raw = self.execute_read(sql)?;
        let row = raw.rows.into_iter().next().map(|row| shape_row(shaper, row));
        if row.is_none() {
            debug!(%sql, "query returned no results");
        }
        self.cache.store(key, CachedValue::Row(row.clone()));
        Ok(row)
    }

    fn execute_read(&mut self, sql: &str) -> Result<RawResult, DbError> {
        let conn = self.router.resolve(Role::Read)?;
        self.executor.execute(sql, conn)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a row.
    ///
    /// Returns the generated identifier, or `None` when the target table has
    /// no auto-generated key. Failures are errors, never `None`.
    pub fn insert(&mut self, sql: &str) -> Result<Option<u64>, DbError> {
        let raw = self.execute_write(sql)?;
        Ok(raw.last_insert_id)
    }

    /// Run an update statement.
    ///
    /// The affected-row count is intentionally not reported: its meaning
    /// depends on the query and on whether values actually changed.
    pub fn update(&mut self, sql: &str) -> Result<(), DbError> {
        self.execute_write(sql)?;
        Ok(())
    }

    /// Delete rows, returning the number of rows affected.
    pub fn delete(&mut self, sql: &str) -> Result<u64, DbError> {
        let raw = self.execute_write(sql)?;
        Ok(raw.rows_affected)
    }

    /// Invalidates the cache in full, then executes against the write role.
    fn execute_write(&mut self, sql: &str) -> Result<RawResult, DbError> {
        self.cache.invalidate_all();
        let conn = self.router.resolve(Role::Write)?;
        self.executor.execute(sql, conn)
    }

    // ------------------------------------------------------------------
    // Delayed queries
    // ------------------------------------------------------------------

    /// Queue a query for execution at [`flush_delayed`](Self::flush_delayed)
    /// time. Returns whether registration was accepted.
    pub fn register_delayed(&mut self, sql: impl Into<String>, role: Role) -> bool {
        self.delayed.register(sql, role)
    }

    /// Queue a query together with a handler for its raw result.
    pub fn register_delayed_with_handler(
        &mut self,
        sql: impl Into<String>,
        role: Role,
        handler: impl FnOnce(&RawResult) + 'static,
    ) -> bool {
        self.delayed.register_with_handler(sql, role, handler)
    }

    /// Execute every delayed query in registration order.
    ///
    /// Failures are logged and suppressed; this never fails.
    pub fn flush_delayed(&mut self) {
        self.delayed.flush(&mut self.router, &self.executor);
    }

    // ------------------------------------------------------------------
    // Schema surface
    // ------------------------------------------------------------------

    /// List the tables whose names start with the configured prefix.
    ///
    /// The list is computed once per instance and never refreshed, even if
    /// the schema changes later in the process lifetime.
    pub fn tables(&mut self) -> Result<Vec<String>, DbError> {
        if let Some(tables) = &self.tables {
            return Ok(tables.clone());
        }

        let sql = format!("SHOW TABLES LIKE '{}%'", self.table_prefix);
        let rows = self.fetch_all(&sql)?;

        let mut tables = Vec::new();
        for row in &rows {
            if let Some(object) = row.as_object() {
                for value in object.values() {
                    if let Some(name) = value.as_str() {
                        tables.push(name.to_string());
                    }
                }
            }
        }

        self.tables = Some(tables.clone());
        Ok(tables)
    }

    /// Run a schema script: every `;`-and-newline-terminated statement is
    /// executed via [`update`](Self::update), with the `prefix_` placeholder
    /// replaced by the configured table prefix and `--` comments stripped.
    ///
    /// A failing statement does not halt the script. After every statement
    /// has been attempted, accumulated failures are raised together as
    /// [`DbError::Script`].
    pub fn run_script(&mut self, script: &str) -> Result<(), DbError> {
        let mut errors = Vec::new();

        for statement in split_statements(script) {
            let statement = statement.replace(PREFIX_PLACEHOLDER, &self.table_prefix);
            if statement.trim().is_empty() {
                continue;
            }
            if let Err(e) = self.update(&statement) {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DbError::Script(errors))
        }
    }

    /// Probe whether the installation is ready to serve.
    ///
    /// A failure of any kind (connection, selection, or the probe statement
    /// itself) surfaces as [`DbError::Installation`], so callers can tell
    /// "not yet installed" apart from a broken query. Success is remembered
    /// for the life of the instance.
    pub fn assert_installed(&mut self) -> Result<(), DbError> {
        if self.installed {
            return Ok(());
        }

        let sql = format!(
            "SELECT value FROM {}datalists WHERE name = 'installed'",
            self.table_prefix
        );
        let result = match self.router.resolve(Role::Read) {
            Ok(conn) => self.executor.execute(&sql, conn),
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => {
                self.installed = true;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "installation probe failed");
                Err(DbError::Installation(
                    "unable to handle this request; the site is not configured or the database is down"
                        .to_string(),
                ))
            }
        }
    }

    // ------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------

    /// Number of statements actually sent to the database.
    ///
    /// Cache hits are served without a statement and are not counted.
    pub fn query_count(&self) -> u64 {
        self.executor.query_count()
    }

    /// Result cache telemetry
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The configured table-name prefix
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }
}

fn shape_row(shaper: Option<&RowShaper>, row: Value) -> Value {
    match shaper {
        Some(shaper) => shaper.apply(row),
        None => row,
    }
}

/// Split a schema script into statements: strip `--` comments, then split on
/// a statement terminator followed by a newline.
fn split_statements(script: &str) -> Vec<String> {
    let without_comments: String = script
        .lines()
        .map(|line| line.find("--").map_or(line, |i| &line[..i]))
        .collect::<Vec<_>>()
        .join("\n");
    without_comments
        .split(";\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
