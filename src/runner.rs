use std::io::Write;

use tracing::{debug, error, info, warn};

use crate::config::ServerOptions;
use crate::descriptor::ConnectionDescriptor;
use crate::error::{ErrorKind, SmokeError};
use crate::results::ResultSet;
use crate::session::{Connector, Session};
use crate::statements::{Statement, Step};

pub const ERROR_PREFIX: &str = "An error occurred:";

/// What a finished step produced.
#[derive(Debug, Clone)]
pub enum StepResult {
    Connected,
    Rows(ResultSet),
    Executed { rows_affected: u64 },
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: Step,
    pub result: StepResult,
}

/// The first failing step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub step: Step,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<StepOutcome>,
    pub failure: Option<RunFailure>,
    /// The connection was opened.
    pub connected: bool,
    /// The connection was released without error.
    pub closed: bool,
}

impl RunReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Rows returned by the final select, if it ran.
    #[must_use]
    pub fn selected_rows(&self) -> Option<&ResultSet> {
        self.outcomes.iter().find_map(|o| match (&o.step, &o.result) {
            (Step::Select, StepResult::Rows(rs)) => Some(rs),
            _ => None,
        })
    }
}

/// Runs the fixed smoke sequence against whatever `C` connects to.
///
/// The connection is held in an `Option` that is only filled after a
/// successful connect, so cleanup never touches a session that was not opened.
#[derive(Debug, Clone)]
pub struct Runner<C> {
    connector: C,
    options: ServerOptions,
}

impl<C: Connector> Runner<C> {
    pub fn new(connector: C, options: ServerOptions) -> Self {
        Self { connector, options }
    }

    #[must_use]
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::from_options(&self.options)
    }

    /// Run every step, printing results to `out`.
    ///
    /// Never returns an error: the first failure is printed with
    /// [`ERROR_PREFIX`], recorded in the report, and the run moves on to
    /// cleanup.
    pub async fn run<W: Write>(&self, out: &mut W) -> RunReport {
        let descriptor = self.descriptor();
        debug!(%descriptor, "connection descriptor");

        let mut report = RunReport::default();
        let mut session: Option<C::Session> = None;

        if let Err((step, err)) = self
            .run_steps(&descriptor, &mut session, out, &mut report)
            .await
        {
            error!(%step, kind = %err.kind(), error = %err, "smoke run failed");
            say(out, &format!("{ERROR_PREFIX} {err}"));
            report.failure = Some(RunFailure {
                step,
                kind: err.kind(),
                message: err.to_string(),
            });
        }

        if let Some(open) = session.take() {
            match open.close().await {
                Ok(()) => {
                    info!("connection closed");
                    report.closed = true;
                }
                Err(e) => warn!(error = %e, "failed to close connection"),
            }
        }

        report
    }

    async fn run_steps<W: Write>(
        &self,
        descriptor: &ConnectionDescriptor,
        session: &mut Option<C::Session>,
        out: &mut W,
        report: &mut RunReport,
    ) -> Result<(), (Step, SmokeError)> {
        info!(step = %Step::Connect, "starting");
        let opened = self
            .connector
            .connect(descriptor)
            .await
            .map_err(|e| (Step::Connect, e))?;
        report.connected = true;
        report.outcomes.push(StepOutcome {
            step: Step::Connect,
            result: StepResult::Connected,
        });
        let conn = session.insert(opened);

        for statement in Statement::ALL {
            let step = Step::from(statement);
            info!(%step, "starting");
            let result = run_statement(conn, statement)
                .await
                .map_err(|e| (step, e))?;
            print_statement(out, statement, &result);
            report.outcomes.push(StepOutcome { step, result });
        }

        Ok(())
    }
}

async fn run_statement<S: Session>(
    session: &mut S,
    statement: Statement,
) -> Result<StepResult, SmokeError> {
    let sql = statement.sql();
    if !statement.commits() {
        let rows = session.query(sql).await?;
        debug!(%statement, rows = rows.len(), "query finished");
        return Ok(StepResult::Rows(rows));
    }

    session.begin().await?;
    match session.execute(sql).await {
        Ok(rows_affected) => {
            session.commit().await?;
            debug!(%statement, rows_affected, "committed");
            Ok(StepResult::Executed { rows_affected })
        }
        Err(err) => {
            if let Err(rb) = session.rollback().await {
                warn!(%statement, error = %rb, "rollback after failed statement also failed");
            }
            Err(err)
        }
    }
}

fn print_statement<W: Write>(out: &mut W, statement: Statement, result: &StepResult) {
    let rows = match result {
        StepResult::Rows(rows) => Some(rows),
        StepResult::Connected | StepResult::Executed { .. } => None,
    };
    match statement {
        Statement::Version => {
            say(out, "SQL Server version:");
            match rows.and_then(ResultSet::first) {
                Some(row) => say(out, &row.to_string()),
                None => say(out, "None"),
            }
        }
        Statement::CreateTable => say(out, "Table created successfully."),
        Statement::Insert => say(out, "Data inserted successfully."),
        Statement::Select => {
            if let Some(rows) = rows {
                for row in &rows.results {
                    say(out, &row.to_string());
                }
            }
        }
    }
}

fn say<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        warn!(error = %e, "failed to write output line");
    }
}
