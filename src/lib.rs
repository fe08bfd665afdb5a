//! # splitdb
//!
//! A synchronous database access layer that sits between application code
//! and a relational database, providing:
//!
//! - routing of operations across separately configured read and write
//!   connections, established lazily and at most once per role
//! - an in-memory LRU cache of shaped read-query results, invalidated in
//!   full before every write
//! - a queue of queries deferred until the end of a request and flushed as a
//!   batch, in order, with per-entry failures logged and suppressed
//! - centralized translation of raw driver failures into a typed error
//!
//! The layer speaks no wire protocol itself: the embedding application
//! implements the [`SqlDriver`]/[`DriverConnection`] boundary for its driver
//! of choice, and hands one [`Database`] instance to each unit of work.
//!
//! ## Usage
//!
//! ```ignore
//! use splitdb::{Database, DatabaseConfig, Role};
//!
//! let config = DatabaseConfig::new("db.internal", "app", "secret", "app_db")
//!     .with_table_prefix("app_");
//! let mut db = Database::new(config, Box::new(MyDriver::new()));
//!
//! let users = db.fetch_all("SELECT id, name FROM app_users")?;
//! db.register_delayed("UPDATE app_stats SET hits = hits + 1", Role::Write);
//! db.flush_delayed();
//! ```

mod cache;
mod config;
mod database;
mod delayed;
mod driver;
mod error;
mod executor;
mod router;
mod shape;

#[cfg(test)]
mod test_util;

// Re-exports
pub use cache::{
    CacheConfig, CacheKey, CacheStats, CachedValue, QueryCache, DEFAULT_CACHE_CAPACITY,
};
pub use config::{ConnectParams, DatabaseConfig};
pub use database::Database;
pub use delayed::{DelayedHandler, DelayedQueryQueue};
pub use driver::{DriverConnection, DriverError, RawResult, SqlDriver};
pub use error::DbError;
pub use executor::QueryExecutor;
pub use router::{ConnectionRouter, Role};
pub use shape::RowShaper;
