//! Simulation configuration.
//!
//! Values come from [`SimulationConfig::default`], then an optional TOML file,
//! then `CLEX_*` environment variables (e.g. `CLEX_BETA=2.5`,
//! `CLEX_SPECIES_MAX=4,4,1`). Command-line flags are applied last by the caller.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Parameters of a simple-cubic demo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Edge length of the cubic supercell.
    pub supercell: i32,
    /// Maximum count per species inside one cluster; the last entry is
    /// usually the vacancy.
    pub species_max: Vec<usize>,
    /// Label of the vacancy species.
    pub vacancy: usize,
    /// Number of vacancies placed in the initial state.
    pub vacancies: usize,
    /// Include the nearest-neighbour triangle template.
    pub triplets: bool,
    pub beta: f64,
    /// Swap trials per sweep.
    pub trials: u64,
    /// Sweeps, each followed by one transport sample.
    pub samples: u64,
    pub seed: u64,
    /// Per-orbit energy coefficients; random small values when empty.
    pub coefficients: Vec<f64>,
    /// Constant KRA barrier applied to every jump.
    pub kra_barrier: f64,
    /// Where to write the bincode catalog, if anywhere.
    pub catalog_out: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            supercell: 4,
            species_max: vec![4, 4, 1],
            vacancy: 2,
            vacancies: 1,
            triplets: true,
            beta: 1.0,
            trials: 10_000,
            samples: 10,
            seed: 42,
            coefficients: Vec::new(),
            kra_barrier: 0.5,
            catalog_out: None,
        }
    }
}

impl SimulationConfig {
    /// Layer defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("CLEX")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("species_max")
                    .with_list_parse_key("coefficients"),
            )
            .build()?
            .try_deserialize()
    }
}
