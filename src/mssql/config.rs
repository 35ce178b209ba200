use tiberius::{AuthMethod, Config as TiberiusConfig, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use crate::config::{EncryptMode, ServerOptions};
use crate::error::SmokeError;

/// Type alias for SQL Server client
pub type MssqlClient = tiberius::Client<Compat<TcpStream>>;

const APPLICATION_NAME: &str = "mssql-smoke";

/// The connection is made natively over TDS, so `DRIVER` only has to name a
/// SQL Server driver. Anything else behaves like a driver that is not
/// installed.
///
/// # Errors
/// Returns `SmokeError::ConnectionError` if the driver is not a SQL Server driver.
pub fn validate_driver(driver: &str) -> Result<(), SmokeError> {
    let normalized = driver
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_ascii_lowercase();
    if normalized.contains("sql server") {
        Ok(())
    } else {
        Err(SmokeError::ConnectionError(format!(
            "driver not found: '{driver}' is not a SQL Server driver"
        )))
    }
}

/// How the TCP endpoint of a server is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Dial this port on the host.
    Direct(u16),
    /// Ask the SQL Browser (UDP 1434) where the named instance listens.
    Browser,
}

/// An explicit port always wins; the SQL Browser is only consulted for a
/// named instance without one.
#[must_use]
pub fn route(opts: &ServerOptions) -> Route {
    match (&opts.instance_name, opts.port) {
        (Some(_), None) => Route::Browser,
        _ => Route::Direct(opts.effective_port()),
    }
}

#[must_use]
pub fn encryption_level(mode: EncryptMode) -> EncryptionLevel {
    match mode {
        EncryptMode::No => EncryptionLevel::Off,
        EncryptMode::Yes | EncryptMode::Strict => EncryptionLevel::Required,
    }
}

#[must_use]
pub fn build_tiberius_config(opts: &ServerOptions) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.application_name(APPLICATION_NAME);
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    config.encryption(encryption_level(opts.encrypt));
    match route(opts) {
        Route::Direct(port) => config.port(port),
        Route::Browser => {
            if let Some(instance) = &opts.instance_name {
                config.instance_name(instance);
            }
        }
    }
    if opts.trust_server_certificate {
        config.trust_cert();
    }
    config
}
