use chrono::NaiveDateTime;

/// Values read back from a SQL Server row.
///
/// ```rust
/// use mssql_smoke::RowValues;
///
/// let row = vec![RowValues::Int(1), RowValues::Text("John Doe".into())];
/// assert_eq!(row[0].as_int(), Some(&1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

/// Literal rendering used when printing rows: text is quoted like a Python
/// `repr` (single quotes unless the text holds a `'` and no `"`), NULL is
/// `None`, booleans are `True`/`False`, binary is `b'..'` with hex escapes.
impl std::fmt::Display for RowValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v:?}"),
            RowValues::Text(s) => {
                let quote = if s.contains('\'') && !s.contains('"') {
                    '"'
                } else {
                    '\''
                };
                write!(f, "{quote}")?;
                for ch in s.chars() {
                    match ch {
                        c if c == quote => write!(f, "\\{c}")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "{quote}")
            }
            RowValues::Bool(true) => f.write_str("True"),
            RowValues::Bool(false) => f.write_str("False"),
            RowValues::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            RowValues::Null => f.write_str("None"),
            RowValues::Blob(bytes) => {
                f.write_str("b'")?;
                for b in bytes {
                    write!(f, "\\x{b:02x}")?;
                }
                f.write_str("'")
            }
        }
    }
}
