mod args;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use mssql_smoke::{MssqlConnector, Runner};
use tracing::Level;

use crate::args::Args;
use crate::logging::log_writer;

fn main() -> ExitCode {
    let args = Args::parse();
    let writer = match log_writer(args.log.as_deref()) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("failed to open log file: {err}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let options = match args.resolve_options() {
        Ok(options) => options,
        Err(err) => {
            tracing::error!("{err}");
            return ExitCode::from(2);
        }
    };

    let config_json =
        serde_json::to_string_pretty(&options.redacted()).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!("failed to start runtime: {err}");
            return ExitCode::from(2);
        }
    };

    let runner = Runner::new(MssqlConnector::new(), options);
    let report = rt.block_on(runner.run(&mut std::io::stdout()));

    if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
