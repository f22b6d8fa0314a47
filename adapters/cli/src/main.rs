#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a command script against a map.

mod inputs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crisis_response_simulation::Simulation;
use tracing_subscriber::EnvFilter;

/// Runs a crisis response simulation to completion and prints its summary.
#[derive(Debug, Parser)]
#[command(name = "crisis-response", version, about)]
struct Args {
    /// TOML map description.
    #[arg(long)]
    map: PathBuf,
    /// JSON command script with one batch per tick.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Overrides the seed from the map.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the tick budget from the map.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Ticks between progress log lines.
    #[arg(long, default_value_t = 50)]
    progress_every: u64,
}

/// Entry point for the crisis response command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut description = inputs::load_map(&args.map)?;
    if let Some(seed) = args.seed {
        description.seed = seed;
    }
    if let Some(max_ticks) = args.max_ticks {
        description.max_ticks = max_ticks;
    }
    let script = match &args.script {
        Some(path) => inputs::load_script(path)?,
        None => Vec::new(),
    };

    let mut simulation = Simulation::new(&description)
        .with_context(|| format!("invalid map {}", args.map.display()))?;
    tracing::info!(
        seed = description.seed,
        max_ticks = description.max_ticks,
        batches = script.len(),
        "simulation started"
    );

    let mut batches = script.into_iter();
    while !simulation.status().is_terminated() {
        let batch = batches.next().unwrap_or_default();
        let report = simulation.step(&batch);
        let tick = report.snapshot.tick;
        if args.progress_every > 0 && tick % args.progress_every == 0 {
            let totals = simulation.totals();
            tracing::info!(
                tick,
                rescued = totals.counters.rescued,
                deaths = totals.counters.deaths,
                burning = report.snapshot.burning_cells(),
                rubble = report.snapshot.rubble_cells(),
                "progress"
            );
        }
    }

    let summary = simulation.summary();
    tracing::info!(ticks = summary.ticks, status = ?summary.status, "simulation finished");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
