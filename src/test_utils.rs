//! In-memory stand-in for a SQL Server, for exercising the runner without a
//! live instance.
//!
//! It understands exactly the smoke statements, keeps its tables across
//! sessions so a second run sees what the first one committed, and counts
//! opened and closed sessions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::descriptor::ConnectionDescriptor;
use crate::error::SmokeError;
use crate::mssql::validate_driver;
use crate::results::ResultSet;
use crate::session::{Connector, Session};
use crate::statements::{CREATE_TABLE, INSERT_ROW, SELECT_ALL, TEST_TABLE, VERSION_QUERY};
use crate::types::RowValues;

pub const MEMORY_SERVER_VERSION: &str =
    "Microsoft SQL Server 2022 (RTM) - 16.0.1000.6 (X64) (in-memory test double)";

type Tables = BTreeMap<String, Vec<(i64, String)>>;

#[derive(Debug, Default)]
struct ServerState {
    tables: Tables,
    opened: usize,
    closed: usize,
    commits: usize,
    rollbacks: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
    user: String,
    password: String,
    reachable: bool,
    concurrent_writer: bool,
    failing_rollback: bool,
}

impl MemoryServer {
    #[must_use]
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState::default())),
            user: user.to_string(),
            password: password.to_string(),
            reachable: true,
            concurrent_writer: false,
            failing_rollback: false,
        }
    }

    /// Every connect attempt fails as if nothing listens on the port.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Pre-create `TestTable`, as if an earlier run had already committed it.
    #[must_use]
    pub fn with_existing_table(self) -> Self {
        self.lock().tables.insert(TEST_TABLE.to_string(), Vec::new());
        self
    }

    /// Another client slips `(1, 'Jane Roe')` into `TestTable` right after
    /// the commit that creates it.
    #[must_use]
    pub fn with_concurrent_writer(mut self) -> Self {
        self.concurrent_writer = true;
        self
    }

    /// `ROLLBACK` is rejected, as on a connection the server already dropped.
    #[must_use]
    pub fn failing_rollback(mut self) -> Self {
        self.failing_rollback = true;
        self
    }

    #[must_use]
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
        }
    }

    #[must_use]
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    /// Committed rows of `TestTable`, or `None` if it does not exist.
    #[must_use]
    pub fn test_table_rows(&self) -> Option<Vec<(i64, String)>> {
        self.lock().tables.get(TEST_TABLE).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<MemorySession, SmokeError> {
        let opts = descriptor.connect_options()?;
        validate_driver(&opts.driver)?;
        if !self.server.reachable {
            return Err(SmokeError::ConnectionError(format!(
                "TCP connection error: connection refused ({}:{})",
                opts.server,
                opts.effective_port()
            )));
        }
        if opts.user != self.server.user || opts.password != self.server.password {
            return Err(SmokeError::ConnectionError(format!(
                "SQL Server connection error: Login failed for user '{}'.",
                opts.user
            )));
        }

        self.server.lock().opened += 1;
        Ok(MemorySession {
            server: self.server.clone(),
            tables: None,
        })
    }
}

/// Writes go to a private copy of the tables while a transaction is open and
/// are published on commit.
#[derive(Debug)]
pub struct MemorySession {
    server: MemoryServer,
    tables: Option<Tables>,
}

impl MemorySession {
    fn apply(&mut self, sql: &str) -> Result<u64, SmokeError> {
        let mut committed = None;
        let tables = match self.tables.as_mut() {
            Some(tables) => tables,
            // autocommit: mutate a copy and publish it right away
            None => committed.insert(self.server.lock().tables.clone()),
        };

        let affected = match sql.trim() {
            CREATE_TABLE => {
                if tables.contains_key(TEST_TABLE) {
                    return Err(SmokeError::SchemaError(format!(
                        "There is already an object named '{TEST_TABLE}' in the database."
                    )));
                }
                tables.insert(TEST_TABLE.to_string(), Vec::new());
                0
            }
            INSERT_ROW => {
                let rows = tables.get_mut(TEST_TABLE).ok_or_else(|| {
                    SmokeError::ExecutionError(format!("Invalid object name '{TEST_TABLE}'."))
                })?;
                if rows.iter().any(|(id, _)| *id == 1) {
                    return Err(SmokeError::ConstraintError(format!(
                        "Violation of PRIMARY KEY constraint. Cannot insert duplicate key in object 'dbo.{TEST_TABLE}'. The duplicate key value is (1)."
                    )));
                }
                rows.push((1, "John Doe".to_string()));
                1
            }
            other => {
                return Err(SmokeError::ExecutionError(format!(
                    "unsupported statement: {other}"
                )));
            }
        };

        if let Some(tables) = committed {
            self.server.lock().tables = tables;
        }
        Ok(affected)
    }

    fn visible_tables(&self) -> Tables {
        match &self.tables {
            Some(tables) => tables.clone(),
            None => self.server.lock().tables.clone(),
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SmokeError> {
        match sql.trim() {
            VERSION_QUERY => {
                let mut rs = ResultSet::with_capacity(1);
                rs.set_column_names(Arc::new(vec![String::new()]));
                rs.add_row_values(vec![RowValues::Text(MEMORY_SERVER_VERSION.to_string())]);
                Ok(rs)
            }
            SELECT_ALL => {
                let tables = self.visible_tables();
                let rows = tables.get(TEST_TABLE).ok_or_else(|| {
                    SmokeError::ExecutionError(format!("Invalid object name '{TEST_TABLE}'."))
                })?;
                let mut rs = ResultSet::with_capacity(rows.len());
                rs.set_column_names(Arc::new(vec!["id".to_string(), "name".to_string()]));
                for (id, name) in rows {
                    rs.add_row_values(vec![RowValues::Int(*id), RowValues::Text(name.clone())]);
                }
                Ok(rs)
            }
            other => Err(SmokeError::ExecutionError(format!(
                "unsupported query: {other}"
            ))),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, SmokeError> {
        self.apply(sql)
    }

    async fn begin(&mut self) -> Result<(), SmokeError> {
        if self.tables.is_some() {
            return Err(SmokeError::ExecutionError(
                "transaction already open".to_string(),
            ));
        }
        self.tables = Some(self.server.lock().tables.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SmokeError> {
        let tables = self.tables.take().ok_or_else(|| {
            SmokeError::ExecutionError(
                "The COMMIT TRANSACTION request has no corresponding BEGIN TRANSACTION."
                    .to_string(),
            )
        })?;
        let mut state = self.server.lock();
        state.tables = tables;
        state.commits += 1;
        if self.server.concurrent_writer {
            if let Some(rows) = state.tables.get_mut(TEST_TABLE) {
                if rows.is_empty() {
                    rows.push((1, "Jane Roe".to_string()));
                }
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SmokeError> {
        if self.server.failing_rollback {
            self.tables = None;
            return Err(SmokeError::ConnectionError(
                "ROLLBACK failed: connection reset by peer".to_string(),
            ));
        }
        if self.tables.take().is_none() {
            return Err(SmokeError::ExecutionError(
                "The ROLLBACK TRANSACTION request has no corresponding BEGIN TRANSACTION."
                    .to_string(),
            ));
        }
        self.server.lock().rollbacks += 1;
        Ok(())
    }

    async fn close(self) -> Result<(), SmokeError> {
        self.server.lock().closed += 1;
        Ok(())
    }
}
