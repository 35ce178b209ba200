//! Connectivity smoke run for SQL Server.
//!
//! A [`Runner`] opens one connection described by ODBC-style
//! [`ConnectionDescriptor`] parameters, then runs a fixed sequence: a version
//! query, `CREATE TABLE TestTable`, a single-row insert and a full select. The
//! first failure is printed and ends the run; the connection is released only
//! if it was opened.
//!
//! ```rust,no_run
//! use mssql_smoke::prelude::*;
//!
//! # async fn demo() {
//! let options = ServerOptions::builder()
//!     .server("localhost")
//!     .password("!Passw0rd")
//!     .finish();
//! let runner = Runner::new(MssqlConnector::new(), options);
//! let report = runner.run(&mut std::io::stdout()).await;
//! assert!(report.succeeded());
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod mssql;
pub mod prelude;
pub mod results;
pub mod runner;
pub mod session;
pub mod statements;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{EncryptMode, ServerOptions, ServerOptionsBuilder};
pub use descriptor::{ConnectionDescriptor, ServerAddress};
pub use error::{ErrorKind, SmokeError};
pub use mssql::{MssqlConnector, MssqlSession};
pub use results::{CustomDbRow, ResultSet};
pub use runner::{RunFailure, RunReport, Runner, StepOutcome, StepResult};
pub use session::{Connector, Session};
pub use statements::{Statement, Step};
pub use types::RowValues;
