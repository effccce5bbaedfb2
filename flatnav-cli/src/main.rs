//! `flatnav` binary: builds and queries proximity-graph indexes.
//!
//! Logging is initialised before argument handling so every command emits
//! structured diagnostics. A failed command is logged once with its stable
//! code and error kind, and the exit status tells rejected input (2) apart
//! from a corrupt index file (3) and other failures (1).

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use flatnav_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let summary = run_cli(Cli::parse()).context("flatnav command failed")?;
    let mut writer = BufWriter::new(io::stdout().lock());
    render_summary(&summary, &mut writer).context("failed to write results to stdout")?;
    writer.flush().context("failed to write results to stdout")?;
    Ok(())
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    let message = format!("{err:#}");
    let Some(cli_error) = err.downcast_ref::<CliError>() else {
        error!(error = %message, "flatnav failed");
        return ExitCode::FAILURE;
    };
    error!(
        error = %message,
        code = cli_error.code().map(field::display),
        kind = cli_error.kind().as_str(),
        "flatnav failed"
    );
    ExitCode::from(cli_error.exit_status())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
