use tiberius::{Client, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use super::config::{MssqlClient, Route, build_tiberius_config, route};
use crate::config::ServerOptions;
use crate::error::SmokeError;

/// Helper function to create a new MSSQL connection
///
/// # Errors
/// Returns `SmokeError::ConnectionError` if resolving, the TCP connect or the
/// TDS login fails.
pub async fn create_mssql_client(opts: &ServerOptions) -> Result<MssqlClient, SmokeError> {
    let config = build_tiberius_config(opts);

    let tcp = match route(opts) {
        Route::Browser => TcpStream::connect_named(&config).await.map_err(|e| {
            SmokeError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        })?,
        Route::Direct(port) => {
            let server_addr = tokio::net::lookup_host((opts.server.as_str(), port))
                .await
                .map_err(|e| {
                    SmokeError::ConnectionError(format!("Failed to resolve server address: {e}"))
                })?
                .next()
                .ok_or_else(|| {
                    SmokeError::ConnectionError(format!("No valid address found for {}", opts.server))
                })?;

            TcpStream::connect(server_addr)
                .await
                .map_err(|e| SmokeError::ConnectionError(format!("TCP connection error: {e}")))?
        }
    };

    tcp.set_nodelay(true)
        .map_err(|e| SmokeError::ConnectionError(format!("TCP socket setup error: {e}")))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| SmokeError::ConnectionError(format!("SQL Server connection error: {e}")))
}
