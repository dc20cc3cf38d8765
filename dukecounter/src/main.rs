//! `dukecounter` command-line entry point.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use dukecounter::observability::{init_tracing, LogFormat, Verbosity};
use dukecounter::pipeline::run_with_console;
use dukecounter::utils::{executable_dir, iso_timestamp};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Runs the DukeCounter photon-counting detector simulation.
#[derive(Debug, Parser)]
#[command(name = "dukecounter", version, about)]
struct Cli {
    /// Parameter file with one `key: value` pair per line.
    parameter_file: PathBuf,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit log events as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

async fn run(cli: &Cli) -> anyhow::Result<String> {
    info!(
        parameter_file = %cli.parameter_file.display(),
        started_at = %iso_timestamp(chrono::Utc::now()),
        "Simulation started"
    );
    let report = run_with_console(&cli.parameter_file, &executable_dir())
        .await
        .with_context(|| {
            format!("simulation with {} failed", cli.parameter_file.display())
        })?;
    Ok(report.summary_line())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(
            e.kind(),
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
        ) =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            eprintln!("Usage: dukecounter <parameter-file>");
            return ExitCode::FAILURE;
        }
    };

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(Verbosity::from_flags(cli.quiet, cli.verbose), format);

    // Dropping the run on Ctrl-C kills any subprocess group it started.
    let outcome = tokio::select! {
        result = run(&cli) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted; stopping subprocesses");
            eprintln!("Interrupted");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(summary) => {
            println!("{summary}");
            println!("SIMULATION COMPLETE");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Simulation aborted");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
