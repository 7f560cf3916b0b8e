//! ## threadsleep-cli
//! **Scenario replay from the command line**
//!
//! Replays YAML scenarios against a virtual clock and prints the wake trace
//! and its hash, or shows the effective configuration.

use clap::Parser;
use threadsleep_telemetry::ClockLogger;

mod commands;

use commands::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    ClockLogger::init(&config.telemetry.log_level);

    match cli.command {
        Commands::Replay(args) => commands::run_replay(args, &config).map(drop),
        Commands::CheckConfig => commands::print_config(&config),
    }
}
