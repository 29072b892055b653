//! CLI binary entry point for the HierGossip simulator.
//!
//! Usage:
//!   hiergossip-sim [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>    Path to configuration TOML file
//!   -n, --devices <N>      Number of devices (overrides config)
//!   -s, --seed <SEED>      Seed of the first run (overrides config)
//!   -r, --runs <N>         Number of runs (overrides config)
//!   -o, --output <FILE>    Write the JSON batch report here
//!   --variant <NAME>       Variant to run: bus, buh, tds, tdh (repeatable)
//!   --async                Use the asynchronous round schedule
//!   --both-schedules       Run every seed synchronously and asynchronously
//!   --watch <DEVICE>       Print the final level report of one device
//!   -v, --verbose          Increase logging verbosity

use std::path::PathBuf;

use clap::Parser;

use hiergossip_protocol::DeviceId;
use hiergossip_sim::config::SimConfig;
use hiergossip_sim::scenario::{Scenario, Variant};
use hiergossip_sim::batch::run_batch;

/// HierGossip simulator - hierarchical counting over random device networks.
#[derive(Parser, Debug)]
#[command(name = "hiergossip-sim")]
#[command(about = "Simulate hierarchical leader election and idempotent collection")]
#[command(version)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of devices.
    #[arg(short = 'n', long, value_name = "N")]
    devices: Option<u64>,

    /// Seed of the first run.
    #[arg(short, long, value_name = "SEED")]
    seed: Option<u64>,

    /// Number of runs with consecutive seeds.
    #[arg(short, long, value_name = "N")]
    runs: Option<u64>,

    /// Path of the JSON batch report.
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Variant to run (can be specified multiple times).
    #[arg(long, value_name = "NAME")]
    variant: Vec<Variant>,

    /// Use the asynchronous round schedule.
    #[arg(long = "async")]
    asynchronous: bool,

    /// Run every seed under both round schedules.
    #[arg(long)]
    both_schedules: bool,

    /// Print the final level report of this device for the configured
    /// orientation and hysteresis, instead of running a batch.
    #[arg(long, value_name = "DEVICE")]
    watch: Option<DeviceId>,

    /// Increase logging verbosity (can be repeated: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration.
    let mut config = SimConfig::load(cli.config.as_deref())?;

    // Apply CLI overrides.
    if let Some(devices) = cli.devices {
        config.network.devices = devices;
    }
    if let Some(seed) = cli.seed {
        config.network.seed = seed;
    }
    if let Some(runs) = cli.runs {
        config.batch.runs = runs;
    }
    if cli.output.is_some() {
        config.batch.output = cli.output;
    }
    if !cli.variant.is_empty() {
        config.hierarchy.variants = cli.variant;
    }
    if cli.asynchronous {
        config.schedule.synchronous = false;
    }
    if cli.both_schedules {
        config.batch.both_schedules = true;
    }

    // Adjust log level based on verbosity.
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    // Initialize logging.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    config.validate()?;

    tracing::info!(
        devices = config.network.devices,
        base = config.hierarchy.base,
        end_time = config.schedule.end_time,
        runs = config.batch.runs,
        "Starting HierGossip simulator"
    );

    if let Some(device) = cli.watch {
        let variant = Variant::of(config.hierarchy.orientation, config.hierarchy.hysteresis);
        config.hierarchy.variants = vec![variant];
        let seed = config.network.seed;
        let report = tokio::task::spawn_blocking(move || {
            let mut scenario = Scenario::new(&config, seed, true)?;
            scenario.run()?;
            let report = scenario
                .lane(variant)
                .and_then(|sim| sim.output(device))
                .and_then(|round| round.report.clone());
            Ok::<_, hiergossip_sim::SimError>(report)
        })
        .await??;

        match report {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => anyhow::bail!("device {device} is not part of the network"),
        }
        return Ok(());
    }

    let output = config.batch.output.clone();
    let report = run_batch(config).await?;

    for line in report.summary_lines() {
        println!("{line}");
    }
    if let Some(path) = output {
        report.write_json(std::path::Path::new(&path))?;
    }

    Ok(())
}
