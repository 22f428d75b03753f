//! Cluster-expansion simulation binary.
//!
//! Enumerates decorated-cluster orbits on a simple-cubic lattice, builds the
//! interaction catalog, runs Metropolis sweeps and prints averaged transport
//! tensors as JSON.

mod config;
mod sim;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::SimulationConfig;

/// Cluster-expansion Monte Carlo on a simple-cubic demo lattice.
#[derive(Parser, Debug)]
#[command(
    name = "clex-sim",
    version,
    about = "Cluster-expansion Monte Carlo with kinetic transport expansion"
)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Edge length of the cubic supercell
    #[arg(long)]
    supercell: Option<i32>,

    /// Inverse temperature
    #[arg(long)]
    beta: Option<f64>,

    /// Swap trials per sweep
    #[arg(long)]
    trials: Option<u64>,

    /// Number of sweep and transport samples
    #[arg(long)]
    samples: Option<u64>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the bincode interaction catalog here
    #[arg(long)]
    catalog_out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Command-line values win over file and environment.
    fn apply(&self, cfg: &mut SimulationConfig) {
        if let Some(v) = self.supercell {
            cfg.supercell = v;
        }
        if let Some(v) = self.beta {
            cfg.beta = v;
        }
        if let Some(v) = self.trials {
            cfg.trials = v;
        }
        if let Some(v) = self.samples {
            cfg.samples = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = &self.catalog_out {
            cfg.catalog_out = Some(v.clone());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    let mut cfg =
        SimulationConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut cfg);

    info!("clex-sim v{}", env!("CARGO_PKG_VERSION"));
    info!(
        supercell = cfg.supercell,
        beta = cfg.beta,
        trials = cfg.trials,
        samples = cfg.samples,
        seed = cfg.seed,
        "Starting run"
    );

    let report = sim::run(&cfg)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );
    Ok(())
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
