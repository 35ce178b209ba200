use thiserror::Error;

use tiberius::error::Error as TiberiusError;

#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Constraint violation: {0}")]
    ConstraintError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

/// Coarse category of a [`SmokeError`], used for reporting.
///
/// Every kind is terminal for a run; the category only says which part of the
/// round trip went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Connection,
    Schema,
    Constraint,
    Execution,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Config => "config",
            ErrorKind::Connection => "connection",
            ErrorKind::Schema => "schema",
            ErrorKind::Constraint => "constraint",
            ErrorKind::Execution => "execution",
        };
        f.write_str(label)
    }
}

impl SmokeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SmokeError::ConfigError(_) => ErrorKind::Config,
            SmokeError::ConnectionError(_) => ErrorKind::Connection,
            SmokeError::SchemaError(_) => ErrorKind::Schema,
            SmokeError::ConstraintError(_) => ErrorKind::Constraint,
            SmokeError::ExecutionError(_) => ErrorKind::Execution,
        }
    }
}

/// Map a SQL Server error number onto an [`ErrorKind`].
///
/// Returns `None` for numbers that carry no more specific meaning than
/// "the statement failed".
#[must_use]
pub fn kind_for_server_code(code: u32) -> Option<ErrorKind> {
    match code {
        // object exists, duplicate column, bad column definition, invalid syntax
        2714 | 2705 | 1750 | 173 | 2716 | 102 => Some(ErrorKind::Schema),
        // PK/unique violation, FK/check conflict, NULL into NOT NULL
        2627 | 2601 | 547 | 515 => Some(ErrorKind::Constraint),
        // login failed, cannot open database
        18456 | 4060 => Some(ErrorKind::Connection),
        _ => None,
    }
}

fn classify_server_code(err: &TiberiusError) -> Option<ErrorKind> {
    match err {
        TiberiusError::Server(token) => kind_for_server_code(token.code()),
        TiberiusError::Io { .. } | TiberiusError::Routing { .. } => Some(ErrorKind::Connection),
        _ => None,
    }
}

/// Wrap a driver error raised while running `context`, keeping the server's
/// message but sorting it into the matching `SmokeError` variant.
pub(crate) fn classify_mssql_error(context: &str, err: TiberiusError) -> SmokeError {
    match classify_server_code(&err) {
        Some(ErrorKind::Schema) => SmokeError::SchemaError(format!("{context}: {err}")),
        Some(ErrorKind::Constraint) => SmokeError::ConstraintError(format!("{context}: {err}")),
        Some(ErrorKind::Connection) => SmokeError::ConnectionError(format!("{context}: {err}")),
        Some(ErrorKind::Config | ErrorKind::Execution) | None => {
            SmokeError::ExecutionError(format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_codes_map_to_kinds() {
        assert_eq!(kind_for_server_code(2714), Some(ErrorKind::Schema));
        assert_eq!(kind_for_server_code(2627), Some(ErrorKind::Constraint));
        assert_eq!(kind_for_server_code(18456), Some(ErrorKind::Connection));
        assert_eq!(kind_for_server_code(8134), None);
    }

    #[test]
    fn string_variants_report_their_kind() {
        assert_eq!(
            SmokeError::SchemaError("exists".into()).kind(),
            ErrorKind::Schema
        );
        assert_eq!(
            SmokeError::ConstraintError("dup".into()).kind(),
            ErrorKind::Constraint
        );
        assert_eq!(
            SmokeError::ConfigError("bad".into()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn io_errors_classify_as_connection() {
        let err = TiberiusError::Io {
            kind: std::io::ErrorKind::ConnectionRefused,
            message: "refused".into(),
        };
        let classified = classify_mssql_error("connect", err);
        assert_eq!(classified.kind(), ErrorKind::Connection);
        assert!(classified.to_string().contains("refused"));
    }
}
