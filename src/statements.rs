//! The fixed statement sequence of a smoke run.

pub const VERSION_QUERY: &str = "SELECT @@version;";
pub const CREATE_TABLE: &str = "CREATE TABLE TestTable (id INT PRIMARY KEY, name NVARCHAR(50));";
pub const INSERT_ROW: &str = "INSERT INTO TestTable (id, name) VALUES (1, 'John Doe');";
pub const SELECT_ALL: &str = "SELECT * FROM TestTable;";

pub const TEST_TABLE: &str = "TestTable";

/// One of the four statements sent once the connection is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    Version,
    CreateTable,
    Insert,
    Select,
}

impl Statement {
    /// Execution order.
    pub const ALL: [Statement; 4] = [
        Statement::Version,
        Statement::CreateTable,
        Statement::Insert,
        Statement::Select,
    ];

    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Statement::Version => VERSION_QUERY,
            Statement::CreateTable => CREATE_TABLE,
            Statement::Insert => INSERT_ROW,
            Statement::Select => SELECT_ALL,
        }
    }

    /// Mutating statements run in their own transaction and are committed on success.
    #[must_use]
    pub fn commits(self) -> bool {
        match self {
            Statement::CreateTable | Statement::Insert => true,
            Statement::Version | Statement::Select => false,
        }
    }
}

/// A point in the run where it can stop: the connect, or one of the statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Connect,
    Version,
    CreateTable,
    Insert,
    Select,
}

impl Step {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Step::Connect => "connect",
            Step::Version => "version",
            Step::CreateTable => "create_table",
            Step::Insert => "insert",
            Step::Select => "select",
        }
    }
}

impl From<Statement> for Step {
    fn from(statement: Statement) -> Self {
        match statement {
            Statement::Version => Step::Version,
            Statement::CreateTable => Step::CreateTable,
            Statement::Insert => Step::Insert,
            Statement::Select => Step::Select,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Step::from(*self).fmt(f)
    }
}
