use async_trait::async_trait;
use tracing::{debug, info};

use super::client::create_mssql_client;
use super::config::{MssqlClient, validate_driver};
use super::query::{build_result_set, execute_statement};
use super::transaction::{begin_transaction, commit_transaction, rollback_transaction};
use crate::descriptor::ConnectionDescriptor;
use crate::error::SmokeError;
use crate::results::ResultSet;
use crate::session::{Connector, Session};

/// Connects to a real SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlConnector;

impl MssqlConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    type Session = MssqlSession;

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<MssqlSession, SmokeError> {
        let opts = descriptor.connect_options()?;
        validate_driver(&opts.driver)?;
        debug!(%descriptor, "opening SQL Server connection");

        let client = create_mssql_client(&opts).await?;
        info!(server = %opts.server, database = %opts.database, "connected");
        Ok(MssqlSession { client })
    }
}

pub struct MssqlSession {
    client: MssqlClient,
}

impl std::fmt::Debug for MssqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlSession")
            .field("client", &"<MssqlClient>")
            .finish()
    }
}

#[async_trait]
impl Session for MssqlSession {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SmokeError> {
        build_result_set(&mut self.client, sql).await
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, SmokeError> {
        execute_statement(&mut self.client, sql).await
    }

    async fn begin(&mut self) -> Result<(), SmokeError> {
        begin_transaction(&mut self.client).await
    }

    async fn commit(&mut self) -> Result<(), SmokeError> {
        commit_transaction(&mut self.client).await
    }

    async fn rollback(&mut self) -> Result<(), SmokeError> {
        rollback_transaction(&mut self.client).await
    }

    async fn close(self) -> Result<(), SmokeError> {
        self.client
            .close()
            .await
            .map_err(|e| SmokeError::ConnectionError(format!("SQL Server close error: {e}")))
    }
}
