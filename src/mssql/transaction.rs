use tracing::debug;

use super::config::MssqlClient;
use crate::error::{SmokeError, classify_mssql_error};

const BEGIN: &str = "BEGIN TRANSACTION";
const COMMIT: &str = "COMMIT TRANSACTION";
const ROLLBACK: &str = "ROLLBACK TRANSACTION";

// Sent as plain batches: wrapping them in sp_executesql would trip the
// "transaction count after EXECUTE" check on the server.
async fn run_batch(client: &mut MssqlClient, sql: &str) -> Result<(), SmokeError> {
    debug!(statement = sql, "transaction control");
    client
        .simple_query(sql)
        .await
        .map_err(|e| classify_mssql_error(sql, e))?
        .into_results()
        .await
        .map_err(|e| classify_mssql_error(sql, e))?;
    Ok(())
}

/// # Errors
/// Returns `SmokeError` if issuing the BEGIN statement fails.
pub async fn begin_transaction(client: &mut MssqlClient) -> Result<(), SmokeError> {
    run_batch(client, BEGIN).await
}

/// # Errors
/// Returns `SmokeError` if commit fails.
pub async fn commit_transaction(client: &mut MssqlClient) -> Result<(), SmokeError> {
    run_batch(client, COMMIT).await
}

/// # Errors
/// Returns `SmokeError` if rollback fails.
pub async fn rollback_transaction(client: &mut MssqlClient) -> Result<(), SmokeError> {
    run_batch(client, ROLLBACK).await
}
