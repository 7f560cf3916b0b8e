use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use threadsleep_config::ThreadsleepConfig;
use threadsleep_simulator::{ReplayReport, Scenario, ScenarioRunner};
use threadsleep_telemetry::ClockMetrics;
use tracing::info;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/threadsleep.yaml` plus environment overrides
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario file and print its wake trace
    Replay(ReplayArgs),
    /// Print the effective configuration as YAML
    CheckConfig,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Scenario file to replay
    pub scenario: PathBuf,
    /// Fail unless the trace hash matches
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Real-time seconds to wait for sleepers to report back
    #[arg(long, default_value_t = 5.0)]
    pub wake_timeout: f64,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ThreadsleepConfig> {
    let config = match path {
        Some(path) => ThreadsleepConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ThreadsleepConfig::load()?,
    };
    Ok(config)
}

/// Replays a scenario on the configured clock; the scenario's `clock:` block
/// overrides individual fields.
pub fn run_replay(args: ReplayArgs, config: &ThreadsleepConfig) -> anyhow::Result<ReplayReport> {
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let wake_timeout = std::time::Duration::try_from_secs_f64(args.wake_timeout)
        .context("--wake-timeout must be a non-negative number of seconds")?;
    let mut runner = ScenarioRunner::new()
        .clock(config.clock.clone())
        .wake_timeout(wake_timeout);
    let metrics = if config.telemetry.metrics {
        let metrics = ClockMetrics::new()?;
        runner = runner.metrics(metrics.clone());
        Some(metrics)
    } else {
        None
    };

    let report = runner.run(&scenario)?;
    info!(scenario = %report.name, mode = ?report.clock.mode, "replay finished");

    for record in &report.trace {
        println!(
            "step {:>3}  {:<16} target {:>10.3}s  released {:>10.3}s",
            record.step,
            record.label,
            record.target.as_secs_f64(),
            record.at.as_secs_f64()
        );
    }
    println!(
        "clock: {:?}, passthrough below {}s",
        report.clock.mode, report.clock.passthrough_threshold_secs
    );
    println!("final time: {:.3}s", report.final_time.as_secs_f64());
    println!("trace hash: {}", report.hash);

    if let Some(metrics) = metrics {
        print!("{}", metrics.gather_metrics()?);
    }

    if let Some(expected) = args.validate_hash.as_deref() {
        report.validate_hash(expected)?;
        println!("hash validated");
    }
    Ok(report)
}

pub fn print_config(config: &ThreadsleepConfig) -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
