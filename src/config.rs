//! Configuration for the access layer
//!
//! All configuration is an explicit value handed to
//! [`Database::new`](crate::Database::new); there is no ambient or global
//! state. A configuration names one base endpoint and may optionally split
//! reads and writes across separately configured endpoints, each possibly a
//! replica list from which one endpoint is chosen at random.
//!
//! # Example
//!
//! ```
//! use splitdb::{CacheConfig, ConnectParams, DatabaseConfig};
//!
//! let config = DatabaseConfig::new("db.internal", "app", "secret", "app_db")
//!     .with_table_prefix("app_")
//!     .with_read_endpoints(vec![
//!         ConnectParams::new("replica-1.internal", "app_ro", "secret", "app_db"),
//!         ConnectParams::new("replica-2.internal", "app_ro", "secret", "app_db"),
//!     ])
//!     .with_cache(CacheConfig::with_capacity(500));
//! assert!(config.is_split());
//! ```

use rand::seq::SliceRandom;

use crate::cache::CacheConfig;
use crate::router::Role;

/// Credentials and target database for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Database server host
    pub host: String,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
    /// Name of the database to select after connecting
    pub database: String,
}

impl ConnectParams {
    /// Create connection parameters for one endpoint
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }
}

/// Configuration for a [`Database`](crate::Database) instance.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// The base endpoint, used for the combined readwrite session and as the
    /// fallback when a split role has no endpoints of its own
    base: ConnectParams,
    /// Whether reads and writes use separate sessions
    split: bool,
    /// Read-role endpoints (replicas); one is chosen at random
    read_endpoints: Vec<ConnectParams>,
    /// Write-role endpoints; one is chosen at random
    write_endpoints: Vec<ConnectParams>,
    /// Prefix substituted for the `prefix_` placeholder and used by the
    /// table listing and installation probe
    table_prefix: String,
    /// Result cache settings
    cache: CacheConfig,
}

impl DatabaseConfig {
    /// Create a configuration with a single combined endpoint, no table
    /// prefix, and the default cache settings.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            base: ConnectParams::new(host, user, password, database),
            split: false,
            read_endpoints: Vec::new(),
            write_endpoints: Vec::new(),
            table_prefix: String::new(),
            cache: CacheConfig::default(),
        }
    }

    /// Set the table-name prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Split reads from writes without dedicating endpoints to either role.
    ///
    /// Both roles then connect to the base endpoint, over separate sessions.
    pub fn with_split(mut self) -> Self {
        self.split = true;
        self
    }

    /// Dedicate endpoints to the read role. Implies a split configuration.
    pub fn with_read_endpoints(mut self, endpoints: Vec<ConnectParams>) -> Self {
        self.read_endpoints = endpoints;
        self.split = true;
        self
    }

    /// Dedicate endpoints to the write role. Implies a split configuration.
    pub fn with_write_endpoints(mut self, endpoints: Vec<ConnectParams>) -> Self {
        self.write_endpoints = endpoints;
        self.split = true;
        self
    }

    /// Set the result cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Whether reads and writes use separate sessions
    pub fn is_split(&self) -> bool {
        self.split
    }

    /// The configured table-name prefix
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// The result cache configuration
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Pick the endpoint to use when establishing a session for `role`.
    ///
    /// Readwrite always uses the base endpoint. A split role with several
    /// endpoints gets one chosen at random; with none configured it falls
    /// back to the base endpoint.
    pub(crate) fn endpoint_for(&self, role: Role) -> &ConnectParams {
        let candidates = match role {
            Role::Read => &self.read_endpoints,
            Role::Write => &self.write_endpoints,
            Role::ReadWrite => return &self.base,
        };
        candidates
            .choose(&mut rand::thread_rng())
            .unwrap_or(&self.base)
    }
}
