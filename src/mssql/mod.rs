// SQL Server backend over the tiberius TDS client
//
// - config: descriptor/options to tiberius::Config, driver name check
// - client: raw client creation (TCP or SQL Browser named instance)
// - query: result extraction and statement execution
// - transaction: explicit BEGIN/COMMIT/ROLLBACK batches
// - session: Connector/Session implementations

pub mod client;
pub mod config;
pub mod query;
pub mod session;
pub mod transaction;

pub use client::create_mssql_client;
pub use config::{MssqlClient, Route, build_tiberius_config, route, validate_driver};
pub use query::{build_result_set, execute_statement};
pub use session::{MssqlConnector, MssqlSession};
