use async_trait::async_trait;

use crate::descriptor::ConnectionDescriptor;
use crate::error::SmokeError;
use crate::results::ResultSet;

/// Opens sessions from a connection descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    /// # Errors
    /// Returns `SmokeError::ConnectionError` (or a classified driver error)
    /// when the server cannot be reached or rejects the login.
    async fn connect(&self, descriptor: &ConnectionDescriptor)
    -> Result<Self::Session, SmokeError>;
}

/// One open connection. Statements run in the order they are issued.
#[async_trait]
pub trait Session: Send {
    /// Run a statement that returns rows.
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SmokeError>;

    /// Run a statement and return the number of rows it affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, SmokeError>;

    async fn begin(&mut self) -> Result<(), SmokeError>;

    async fn commit(&mut self) -> Result<(), SmokeError>;

    async fn rollback(&mut self) -> Result<(), SmokeError>;

    /// Release the connection.
    async fn close(self) -> Result<(), SmokeError>
    where
        Self: Sized;
}
