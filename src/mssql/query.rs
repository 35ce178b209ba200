use std::sync::Arc;

use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::{Row, Uuid};

use super::config::MssqlClient;
use crate::error::{SmokeError, classify_mssql_error};
use crate::results::ResultSet;
use crate::types::RowValues;

/// Run `sql` as a batch and collect its first result set.
///
/// # Errors
/// Returns a classified `SmokeError` if the server rejects the statement or a
/// row cannot be read.
pub async fn build_result_set(
    client: &mut MssqlClient,
    sql: &str,
) -> Result<ResultSet, SmokeError> {
    let mut stream = client
        .simple_query(sql)
        .await
        .map_err(|e| classify_mssql_error("SQL Server query error", e))?;

    let column_names: Vec<String> = match stream
        .columns()
        .await
        .map_err(|e| classify_mssql_error("SQL Server column fetch error", e))?
    {
        Some(columns) => columns.iter().map(|col| col.name().to_string()).collect(),
        None => Vec::new(),
    };

    let mut result_set = ResultSet::with_capacity(10);
    let col_count = column_names.len();
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_stream = stream.into_row_stream();
    while let Some(row) = rows_stream
        .try_next()
        .await
        .map_err(|e| classify_mssql_error("SQL Server row fetch error", e))?
    {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(extract_value(&row, i));
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Run a statement that returns no rows and report how many rows it touched.
///
/// # Errors
/// Returns a classified `SmokeError` (schema, constraint, ...) on failure.
pub async fn execute_statement(client: &mut MssqlClient, sql: &str) -> Result<u64, SmokeError> {
    let exec_result = client
        .execute(sql, &[])
        .await
        .map_err(|e| classify_mssql_error("SQL Server execution error", e))?;

    Ok(exec_result.rows_affected().iter().sum())
}

macro_rules! try_column {
    ($row:expr, $idx:expr, $ty:ty, $map:expr) => {
        match $row.try_get::<$ty, _>($idx) {
            Ok(Some(val)) => return $map(val),
            Ok(None) => return RowValues::Null,
            Err(_) => {}
        }
    };
}

/// Extract a value from a row at a specific index.
///
/// `try_get` only succeeds for the matching SQL type, so the first type that
/// converts wins; a typed `None` means the column is NULL.
fn extract_value(row: &Row, idx: usize) -> RowValues {
    try_column!(row, idx, i32, |v: i32| RowValues::Int(i64::from(v)));
    try_column!(row, idx, i64, RowValues::Int);
    try_column!(row, idx, i16, |v: i16| RowValues::Int(i64::from(v)));
    try_column!(row, idx, u8, |v: u8| RowValues::Int(i64::from(v)));
    try_column!(row, idx, f64, RowValues::Float);
    try_column!(row, idx, f32, |v: f32| RowValues::Float(f64::from(v)));
    try_column!(row, idx, Numeric, |v: Numeric| RowValues::Float(f64::from(v)));
    try_column!(row, idx, bool, RowValues::Bool);
    try_column!(row, idx, &str, |v: &str| RowValues::Text(v.to_string()));
    try_column!(row, idx, NaiveDateTime, RowValues::Timestamp);
    try_column!(row, idx, Uuid, |v: Uuid| RowValues::Text(v.to_string()));
    try_column!(row, idx, &[u8], |v: &[u8]| RowValues::Blob(v.to_vec()));

    RowValues::Null
}
