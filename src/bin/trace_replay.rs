use clap::Parser;
use flowsim_rs::sim::{ScenarioError, ScenarioSpec, SimTime, run_scenario};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "trace-replay",
    about = "Replay task traces from scenario.json on the flow engine"
)]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Run until this time (ms); defaults to running until completion
    #[arg(long)]
    until_ms: Option<u64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn run(args: Args) -> Result<(), CliError> {
    let spec = ScenarioSpec::load(&args.scenario)?;
    let until = args.until_ms.map(SimTime::from_millis);
    let report = run_scenario(&spec, until)?;

    for task in &report.tasks {
        println!(
            "task_done id={} started_ms={:?} finished_ms={:?} checkpoints={} error={:?}",
            task.task_id, task.started_ms, task.finished_ms, task.checkpoints, task.error
        );
    }
    println!(
        "sim_done final_time_ms={} updates={} demand_pushes={} supply_pushes={}",
        report.final_time_ms,
        report.stats.updates,
        report.stats.demand_pushes,
        report.stats.supply_pushes
    );

    if let Some(path) = args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        eprintln!("wrote report to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("trace_replay: {e}");
            ExitCode::FAILURE
        }
    }
}
