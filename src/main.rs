//! Carbon Disturbance - Scenario Runner
//!
//! Loads a scenario, dispatches every scheduled disturbance event and writes
//! the allocation report as JSON.

use std::path::PathBuf;

use carbon_disturbance::core::config::EngineConfig;
use carbon_disturbance::core::error::Result;
use carbon_disturbance::simulation::{run_scenario, Scenario};
use carbon_disturbance::targets::SeededRandom;
use clap::Parser;

/// Run disturbance events from a scenario file
#[derive(Parser, Debug)]
#[command(name = "carbon-disturbance")]
#[command(about = "Allocate disturbance targets across forest stands")]
struct Args {
    /// Scenario TOML: pools, flux indicators, matrices, stands, events
    #[arg(long)]
    scenario: PathBuf,

    /// Engine configuration TOML (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for RANDOMSORT draws, overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log every event at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "carbon_disturbance=debug"
    } else {
        "carbon_disturbance=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_toml(path)?,
        None => EngineConfig::default(),
    };
    let seed = args.seed.unwrap_or(config.random_seed);
    tracing::info!(scenario = %args.scenario.display(), seed, "loading scenario");

    let scenario = Scenario::load_from_toml(&args.scenario)?;
    let mut random = SeededRandom::new(seed);
    let report = run_scenario(&scenario, &config, &mut random)?;

    let json = report.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!(output = %path.display(), "report written");
        }
        None => println!("{}", json),
    }
    eprintln!("{}", report.summary());
    Ok(())
}
