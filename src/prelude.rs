//! Convenient imports for common functionality.

pub use crate::config::{EncryptMode, ServerOptions, ServerOptionsBuilder};
pub use crate::descriptor::ConnectionDescriptor;
pub use crate::error::{ErrorKind, SmokeError};
pub use crate::mssql::MssqlConnector;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::runner::{RunReport, Runner};
pub use crate::session::{Connector, Session};
pub use crate::statements::{Statement, Step};
pub use crate::types::RowValues;
