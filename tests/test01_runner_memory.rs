use mssql_smoke::test_utils::{MEMORY_SERVER_VERSION, MemoryServer};
use mssql_smoke::{
    ConnectionDescriptor, Connector, ErrorKind, RowValues, RunReport, Runner, ServerOptions,
    Session, SmokeError, Step,
};
use mssql_smoke::statements::{CREATE_TABLE, INSERT_ROW};
use tokio::runtime::Runtime;

const PASSWORD: &str = "!Passw0rd";

fn local_options(password: &str) -> ServerOptions {
    ServerOptions::builder()
        .server("localhost")
        .port(Some(1433))
        .database("master")
        .user("sa")
        .password(password)
        .finish()
}

fn run_once(server: &MemoryServer, options: ServerOptions) -> (RunReport, String) {
    let rt = Runtime::new().unwrap();
    let runner = Runner::new(server.connector(), options);
    let mut out = Vec::new();
    let report = rt.block_on(runner.run(&mut out));
    (report, String::from_utf8(out).unwrap())
}

#[test]
fn fresh_database_prints_every_step() -> Result<(), Box<dyn std::error::Error>> {
    let server = MemoryServer::new("sa", PASSWORD);
    let (report, output) = run_once(&server, local_options(PASSWORD));

    let expected = format!(
        "SQL Server version:\n('{MEMORY_SERVER_VERSION}',)\nTable created successfully.\nData inserted successfully.\n(1, 'John Doe')\n"
    );
    assert_eq!(output, expected);
    assert!(report.succeeded());
    assert!(report.connected);
    assert!(report.closed);

    let steps: Vec<Step> = report.outcomes.iter().map(|o| o.step).collect();
    assert_eq!(
        steps,
        vec![
            Step::Connect,
            Step::Version,
            Step::CreateTable,
            Step::Insert,
            Step::Select
        ]
    );

    let rows = report.selected_rows().ok_or("select did not run")?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.results[0].get("id"), Some(&RowValues::Int(1)));
    assert_eq!(
        rows.results[0].get("name").and_then(RowValues::as_text),
        Some("John Doe")
    );

    assert_eq!(server.commits(), 2);
    assert_eq!(
        server.test_table_rows(),
        Some(vec![(1, "John Doe".to_string())])
    );
    assert_eq!((server.opened(), server.closed()), (1, 1));
    Ok(())
}

#[test]
fn existing_table_fails_creation_but_still_closes() {
    let server = MemoryServer::new("sa", PASSWORD).with_existing_table();
    let (report, output) = run_once(&server, local_options(PASSWORD));

    let failure = report.failure.clone().expect("creation should fail");
    assert_eq!(failure.step, Step::CreateTable);
    assert_eq!(failure.kind, ErrorKind::Schema);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "SQL Server version:");
    assert!(lines[2].starts_with("An error occurred: Schema error:"));
    assert!(lines[2].contains("There is already an object named 'TestTable'"));
    assert_eq!(lines.len(), 3);
    assert!(!output.contains("Table created successfully."));

    assert!(report.closed);
    assert_eq!((server.opened(), server.closed()), (1, 1));
    assert_eq!(server.rollbacks(), 1);
    assert_eq!(server.test_table_rows(), Some(Vec::new()));
}

#[test]
fn invalid_credentials_skip_cleanup_without_crashing() {
    let server = MemoryServer::new("sa", PASSWORD);
    let (report, output) = run_once(&server, local_options("wrong"));

    let failure = report.failure.expect("login should fail");
    assert_eq!(failure.step, Step::Connect);
    assert_eq!(failure.kind, ErrorKind::Connection);
    assert_eq!(
        output,
        "An error occurred: Connection error: SQL Server connection error: Login failed for user 'sa'.\n"
    );

    assert!(!report.connected);
    assert!(!report.closed);
    assert!(report.outcomes.is_empty());
    assert_eq!((server.opened(), server.closed()), (0, 0));
}

#[test]
fn unreachable_server_reports_connection_error() {
    let server = MemoryServer::new("sa", PASSWORD).unreachable();
    let (report, output) = run_once(&server, local_options(PASSWORD));

    assert_eq!(
        report.failure.map(|f| f.kind),
        Some(ErrorKind::Connection)
    );
    assert!(output.starts_with("An error occurred: Connection error:"));
    assert_eq!(server.closed(), 0);
}

#[test]
fn missing_driver_fails_before_connecting() {
    let server = MemoryServer::new("sa", PASSWORD);
    let mut options = local_options(PASSWORD);
    options.driver = "PostgreSQL Unicode".to_string();
    let (report, output) = run_once(&server, options);

    let failure = report.failure.expect("driver check should fail");
    assert_eq!(failure.step, Step::Connect);
    assert_eq!(failure.kind, ErrorKind::Connection);
    assert!(output.contains("driver not found"));
    assert_eq!(server.opened(), 0);
}

#[test]
fn second_run_on_same_database_fails_at_creation() {
    let server = MemoryServer::new("sa", PASSWORD);

    let (first, _) = run_once(&server, local_options(PASSWORD));
    assert!(first.succeeded());

    let (second, output) = run_once(&server, local_options(PASSWORD));
    let failure = second.failure.expect("second run should fail");
    assert_eq!(failure.step, Step::CreateTable);
    assert_eq!(failure.kind, ErrorKind::Schema);
    assert!(output.contains("An error occurred:"));

    // the first run's row is untouched
    assert_eq!(
        server.test_table_rows(),
        Some(vec![(1, "John Doe".to_string())])
    );
    assert_eq!((server.opened(), server.closed()), (2, 2));
}

#[test]
fn duplicate_key_on_insert_is_a_constraint_failure() {
    let server = MemoryServer::new("sa", PASSWORD).with_concurrent_writer();
    let (report, output) = run_once(&server, local_options(PASSWORD));

    let failure = report.failure.clone().expect("insert should fail");
    assert_eq!(failure.step, Step::Insert);
    assert_eq!(failure.kind, ErrorKind::Constraint);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[2], "Table created successfully.");
    assert!(lines[3].starts_with("An error occurred: Constraint violation:"));
    assert!(lines[3].contains("duplicate key"));
    assert!(!output.contains("Data inserted successfully."));
    assert!(report.selected_rows().is_none());

    // the other writer's row survives; ours was rolled back
    assert_eq!(
        server.test_table_rows(),
        Some(vec![(1, "Jane Roe".to_string())])
    );
    assert_eq!((server.commits(), server.rollbacks()), (1, 1));
    assert!(report.closed);
}

#[test]
fn failed_rollback_keeps_the_statement_error() {
    let server = MemoryServer::new("sa", PASSWORD)
        .with_existing_table()
        .failing_rollback();
    let (report, output) = run_once(&server, local_options(PASSWORD));

    let failure = report.failure.expect("creation should fail");
    assert_eq!(failure.step, Step::CreateTable);
    assert_eq!(failure.kind, ErrorKind::Schema);
    assert!(failure.message.contains("There is already an object named"));
    assert!(!output.contains("ROLLBACK"));
    assert_eq!(server.rollbacks(), 0);
    assert_eq!((server.opened(), server.closed()), (1, 1));
}

#[test]
fn rolled_back_transaction_leaves_no_table() {
    let server = MemoryServer::new("sa", PASSWORD);
    let descriptor = ConnectionDescriptor::from_options(&local_options(PASSWORD));
    let rt = Runtime::new().unwrap();

    rt.block_on(async {
        let mut session = server.connector().connect(&descriptor).await.unwrap();
        session.begin().await.unwrap();
        assert_eq!(session.execute(CREATE_TABLE).await.unwrap(), 0);
        assert_eq!(session.execute(INSERT_ROW).await.unwrap(), 1);

        let err = session.execute(INSERT_ROW).await.unwrap_err();
        assert!(matches!(err, SmokeError::ConstraintError(_)));
        assert_eq!(err.kind(), ErrorKind::Constraint);

        session.rollback().await.unwrap();
        session.close().await.unwrap();
    });

    assert_eq!(server.test_table_rows(), None);
    assert_eq!((server.commits(), server.rollbacks()), (0, 1));
}

#[test]
fn unusable_server_fails_at_connect_as_connection_error() {
    let server = MemoryServer::new("sa", PASSWORD);
    let options = ServerOptions::builder()
        .server("")
        .password(PASSWORD)
        .finish();
    let (report, output) = run_once(&server, options);

    let failure = report.failure.expect("connect should fail");
    assert_eq!(failure.step, Step::Connect);
    assert_eq!(failure.kind, ErrorKind::Connection);
    assert!(output.starts_with("An error occurred: Connection error: invalid connection descriptor:"));
    assert!(!report.connected);
    assert_eq!(server.opened(), 0);
}
