//! # clex-mc
//! Monte Carlo and transport engines over an [`InteractionCatalog`](clex_catalog::InteractionCatalog).
//!
//! - [`offsite`]: per-interaction offsite counts and the four-group swap update
//! - [`engine`]: Metropolis sweeps with incremental energy bookkeeping
//! - [`transport`]: jump rates and the Wbar / Bbar transport tensors
//! - [`kra`]: kinetic barrier expansion over transition-state clusters

pub mod engine;
pub mod kra;
pub mod offsite;
pub mod transport;

pub use engine::{MonteCarloEngine, SweepStats, TrialOutcome};
pub use kra::{KraExpansion, TransitionCluster};
pub use offsite::OffsiteCounts;
pub use transport::{
    Jump, KraCoefficients, TransportAccumulator, TransportCoefficients, TransportExpander,
};
