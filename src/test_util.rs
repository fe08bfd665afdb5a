//! Scripted in-memory driver for unit tests.
//!
//! Stands in for the raw driver boundary: records every connect, database
//! selection, and executed statement, and returns canned responses keyed by
//! exact SQL text. Cloning a `MockDriver` shares its state, so a test can
//! keep a clone for assertions after handing the driver to a `Database`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::driver::{DriverConnection, DriverError, RawResult, SqlDriver};

/// Canned response for one SQL text.
#[derive(Debug)]
pub(crate) enum MockResponse {
    Rows(Vec<Value>),
    Insert(Option<u64>),
    Affected(u64),
    Failure(String),
}

#[derive(Debug)]
pub(crate) struct MockState {
    /// Hosts connected to, in order
    pub connects: Vec<String>,
    /// Databases selected, in order
    pub selected: Vec<String>,
    /// Every executed statement as (connection id, sql)
    pub executed: Vec<(usize, String)>,
    pub responses: HashMap<String, MockResponse>,
    pub fail_connect: bool,
    pub fail_select: bool,
    pub alive: bool,
    next_id: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            connects: Vec::new(),
            selected: Vec::new(),
            executed: Vec::new(),
            responses: HashMap::new(),
            fail_connect: false,
            fail_select: false,
            alive: true,
            next_id: 0,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Rc<RefCell<MockState>> {
        Rc::clone(&self.state)
    }

    pub fn rows_for(&self, sql: &str, rows: Vec<Value>) {
        self.state
            .borrow_mut()
            .responses
            .insert(sql.to_string(), MockResponse::Rows(rows));
    }

    pub fn insert_id_for(&self, sql: &str, id: Option<u64>) {
        self.state
            .borrow_mut()
            .responses
            .insert(sql.to_string(), MockResponse::Insert(id));
    }

    pub fn affected_for(&self, sql: &str, rows: u64) {
        self.state
            .borrow_mut()
            .responses
            .insert(sql.to_string(), MockResponse::Affected(rows));
    }

    pub fn fail_on(&self, sql: &str, message: &str) {
        self.state
            .borrow_mut()
            .responses
            .insert(sql.to_string(), MockResponse::Failure(message.to_string()));
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects.len()
    }

    /// All executed statements, in order, regardless of connection
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .borrow()
            .executed
            .iter()
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// All executed statements with the id of the connection that ran them
    pub fn executed(&self) -> Vec<(usize, String)> {
        self.state.borrow().executed.clone()
    }
}

impl SqlDriver for MockDriver {
    fn connect(
        &self,
        host: &str,
        _user: &str,
        _password: &str,
    ) -> Result<Box<dyn DriverConnection>, DriverError> {
        let mut state = self.state.borrow_mut();
        if state.fail_connect {
            return Err(DriverError::new("access denied"));
        }
        state.connects.push(host.to_string());
        let id = state.next_id;
        state.next_id += 1;
        Ok(Box::new(MockConnection {
            id,
            state: Rc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
pub(crate) struct MockConnection {
    id: usize,
    state: Rc<RefCell<MockState>>,
}

impl DriverConnection for MockConnection {
    fn select_database(&mut self, name: &str) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        if state.fail_select {
            return Err(DriverError::new(format!("unknown database '{name}'")));
        }
        state.selected.push(name.to_string());
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<RawResult, DriverError> {
        let mut state = self.state.borrow_mut();
        state.executed.push((self.id, sql.to_string()));
        match state.responses.get(sql) {
            Some(MockResponse::Failure(message)) => Err(DriverError::new(message.clone())),
            Some(MockResponse::Rows(rows)) => Ok(RawResult {
                rows: rows.clone(),
                ..RawResult::default()
            }),
            Some(MockResponse::Insert(id)) => Ok(RawResult {
                last_insert_id: *id,
                ..RawResult::default()
            }),
            Some(MockResponse::Affected(rows)) => Ok(RawResult {
                rows_affected: *rows,
                ..RawResult::default()
            }),
            None => Ok(RawResult::default()),
        }
    }

    fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }
}
