//! Connection routing across read and write roles
//!
//! The router owns every connection handle the layer uses. Handles are
//! established lazily, on first resolution of any role, and memoized for the
//! life of the unit of work: a split configuration gets exactly one `read`
//! and one `write` session, an unsplit one gets a single `readwrite` session
//! that serves both roles.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::driver::{DriverConnection, SqlDriver};
use crate::error::DbError;

/// Statement issued once per session, right after database selection.
const SET_ENCODING: &str = "SET NAMES utf8";

/// Logical purpose of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Select statements
    Read,
    /// Insert/update/delete statements
    Write,
    /// The combined session of an unsplit configuration
    ReadWrite,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::ReadWrite => "readwrite",
        })
    }
}

/// Owns and lazily establishes the connection handles for each role.
pub struct ConnectionRouter {
    driver: Box<dyn SqlDriver>,
    config: DatabaseConfig,
    links: HashMap<Role, Box<dyn DriverConnection>>,
}

impl fmt::Debug for ConnectionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRouter")
            .field("split", &self.config.is_split())
            .field("established", &self.links.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionRouter {
    /// Create a router. No connection is opened until the first
    /// [`resolve`](Self::resolve).
    pub fn new(config: DatabaseConfig, driver: Box<dyn SqlDriver>) -> Self {
        Self {
            driver,
            config,
            links: HashMap::new(),
        }
    }

    /// The configuration this router was built with
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Resolve a role to its connection handle, establishing connections on
    /// first use.
    ///
    /// Under an unsplit configuration `Read` and `Write` both resolve to the
    /// single `ReadWrite` session. Under a split configuration resolving
    /// `ReadWrite` is an error; callers use the concrete roles.
    pub fn resolve(&mut self, role: Role) -> Result<&mut dyn DriverConnection, DbError> {
        // establishment happens once; a later resolve must never reconnect
        if self.links.is_empty() {
            self.setup_connections()?;
        }
        let key = if self.links.contains_key(&role) {
            role
        } else {
            Role::ReadWrite
        };
        match self.links.get_mut(&key) {
            Some(conn) => Ok(conn.as_mut()),
            None => Err(DbError::Connection(format!(
                "no connection available for role '{role}'"
            ))),
        }
    }

    /// Establish every session the configuration calls for.
    fn setup_connections(&mut self) -> Result<(), DbError> {
        if self.config.is_split() {
            self.establish(Role::Read)?;
            self.establish(Role::Write)
        } else {
            self.establish(Role::ReadWrite)
        }
    }

    /// Connect one session for `role`: connect, select the target database,
    /// set the text encoding, memoize the handle.
    fn establish(&mut self, role: Role) -> Result<(), DbError> {
        let endpoint = self.config.endpoint_for(role).clone();
        debug!(host = %endpoint.host, %role, "establishing database connection");

        let mut conn = self
            .driver
            .connect(&endpoint.host, &endpoint.user, &endpoint.password)
            .map_err(|e| {
                DbError::Connection(format!(
                    "could not connect to the database using the given credentials: {e}"
                ))
            })?;

        conn.select_database(&endpoint.database).map_err(|e| {
            DbError::Connection(format!(
                "could not select the database '{}': {e}",
                endpoint.database
            ))
        })?;

        // not routed through the executor: session setup is not a counted
        // statement, and a failure here is not fatal
        if let Err(e) = conn.execute(SET_ENCODING) {
            warn!(error = %e, %role, "failed to set connection encoding");
        }

        self.links.insert(role, conn);
        Ok(())
    }
}
