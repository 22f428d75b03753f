//! Metropolis Monte Carlo over site swaps.
//!
//! The engine borrows an immutable [`InteractionCatalog`] and owns the
//! occupation state and its [`OffsiteCounts`]. A trial applies the exchange
//! to the counts while accumulating the energy change, then either keeps the
//! counts and swaps the occupations or reverts the counts exactly.

use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clex_catalog::InteractionCatalog;
use clex_core::error::SimulationError;
use clex_core::types::{SiteIndex, Species};
use clex_core::traits::KineticBarrier;

use crate::offsite::OffsiteCounts;
use crate::transport::{Jump, TransportCoefficients, TransportExpander};

/// Result of one swap trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub delta_e: f64,
    pub accepted: bool,
}

/// Counters for one sweep.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepStats {
    pub trials: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Sum of accepted energy changes.
    pub delta_energy: f64,
}

impl SweepStats {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepted as f64 / self.trials as f64
        }
    }

    fn record(&mut self, outcome: TrialOutcome) {
        self.trials += 1;
        if outcome.accepted {
            self.accepted += 1;
            self.delta_energy += outcome.delta_e;
        } else {
            self.rejected += 1;
        }
    }
}

/// Metropolis acceptance at inverse temperature `beta`.
///
/// Non-positive changes are always taken, which keeps `beta = inf` well defined.
pub fn metropolis_accept(beta: f64, delta_e: f64, u: f64) -> bool {
    delta_e <= 0.0 || (-beta * delta_e).exp() > u
}

pub(crate) fn check_beta(beta: f64) -> Result<(), SimulationError> {
    if beta.is_nan() || beta < 0.0 {
        return Err(SimulationError::InvalidBeta(beta));
    }
    Ok(())
}

pub(crate) fn check_state(
    catalog: &InteractionCatalog,
    state: &[Species],
) -> Result<(), SimulationError> {
    if state.len() != catalog.num_sites() {
        return Err(SimulationError::StateLength {
            got: state.len(),
            expected: catalog.num_sites(),
        });
    }
    if let Some((site, &species)) = state
        .iter()
        .enumerate()
        .find(|(_, s)| **s >= catalog.num_species())
    {
        return Err(SimulationError::InvalidSpecies {
            site,
            species,
            alphabet: catalog.num_species(),
        });
    }
    Ok(())
}

/// Incremental-energy Metropolis engine.
pub struct MonteCarloEngine<'a> {
    catalog: &'a InteractionCatalog,
    energies: Vec<f64>,
    state: Vec<Species>,
    offsite: OffsiteCounts,
    beta: f64,
    energy: f64,
}

impl<'a> MonteCarloEngine<'a> {
    /// Validate the state and coefficients and count initial mismatches.
    pub fn new(
        catalog: &'a InteractionCatalog,
        coefficients: &[f64],
        state: Vec<Species>,
        beta: f64,
    ) -> Result<Self, SimulationError> {
        check_beta(beta)?;
        check_state(catalog, &state)?;
        let energies = catalog.energies(coefficients)?;
        let offsite = OffsiteCounts::new(catalog, &state);
        let energy: f64 = offsite.active().map(|id| energies[id]).sum();
        debug!(
            sites = state.len(),
            interactions = catalog.len(),
            energy,
            "monte carlo engine ready"
        );
        Ok(Self {
            catalog,
            energies,
            state,
            offsite,
            beta,
            energy,
        })
    }

    pub fn state(&self) -> &[Species] {
        &self.state
    }

    pub fn into_state(self) -> Vec<Species> {
        self.state
    }

    pub fn offsite(&self) -> &OffsiteCounts {
        &self.offsite
    }

    pub fn catalog(&self) -> &InteractionCatalog {
        self.catalog
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<(), SimulationError> {
        check_beta(beta)?;
        self.beta = beta;
        Ok(())
    }

    /// Energy tracked through accepted trials.
    pub fn total_energy(&self) -> f64 {
        self.energy
    }

    /// Energy summed from scratch over the current state.
    pub fn recompute_energy(&self) -> f64 {
        self.catalog
            .interactions()
            .iter()
            .zip(&self.energies)
            .filter(|(i, _)| i.offsite_in(&self.state) == 0)
            .map(|(_, e)| e)
            .sum()
    }

    /// Whether the tracked counts equal a fresh count over the current state.
    pub fn verify_offsite(&self) -> bool {
        self.offsite == OffsiteCounts::new(self.catalog, &self.state)
    }

    fn check_site(&self, site: SiteIndex) -> Result<(), SimulationError> {
        if site >= self.state.len() {
            return Err(SimulationError::SiteOutOfRange {
                site,
                num_sites: self.state.len(),
            });
        }
        Ok(())
    }

    /// One swap trial of sites `a` and `b` with uniform draw `u` in `[0, 1)`.
    pub fn trial(&mut self, a: SiteIndex, b: SiteIndex, u: f64) -> Result<TrialOutcome, SimulationError> {
        self.check_site(a)?;
        self.check_site(b)?;
        if a == b {
            return Err(SimulationError::SameSite(a));
        }
        Ok(self.trial_unchecked(a, b, u))
    }

    fn trial_unchecked(&mut self, a: SiteIndex, b: SiteIndex, u: f64) -> TrialOutcome {
        let (spec_a, spec_b) = (self.state[a], self.state[b]);
        if spec_a == spec_b {
            return TrialOutcome {
                delta_e: 0.0,
                accepted: true,
            };
        }

        let energies = &self.energies;
        let mut delta_e = 0.0;
        self.offsite
            .apply_exchange(self.catalog, (a, spec_a), (b, spec_b), |id, on| {
                if on {
                    delta_e += energies[id];
                } else {
                    delta_e -= energies[id];
                }
            });

        let accepted = metropolis_accept(self.beta, delta_e, u);
        if accepted {
            self.state.swap(a, b);
            self.energy += delta_e;
        } else {
            self.offsite
                .revert_exchange(self.catalog, (a, spec_a), (b, spec_b));
        }
        TrialOutcome { delta_e, accepted }
    }

    /// `trials` swaps of uniformly drawn distinct site pairs.
    pub fn sweep_random<R: Rng>(
        &mut self,
        trials: u64,
        rng: &mut R,
    ) -> Result<SweepStats, SimulationError> {
        let n = self.state.len();
        if n < 2 {
            return Err(SimulationError::TooFewSites(n));
        }
        let start = Instant::now();
        let mut stats = SweepStats::default();
        for _ in 0..trials {
            let a = rng.gen_range(0..n);
            let mut b = rng.gen_range(0..n - 1);
            if b >= a {
                b += 1;
            }
            let u: f64 = rng.gen_range(0.0..1.0);
            stats.record(self.trial_unchecked(a, b, u));
        }
        self.log_sweep(&stats, start);
        Ok(stats)
    }

    /// One trial per supplied pair, with the matching uniform draw.
    pub fn sweep_pairs(
        &mut self,
        pairs: &[(SiteIndex, SiteIndex)],
        uniforms: &[f64],
    ) -> Result<SweepStats, SimulationError> {
        if pairs.len() != uniforms.len() {
            return Err(SimulationError::UniformCount {
                pairs: pairs.len(),
                uniforms: uniforms.len(),
            });
        }
        let start = Instant::now();
        let mut stats = SweepStats::default();
        for (&(a, b), &u) in pairs.iter().zip(uniforms) {
            stats.record(self.trial(a, b, u)?);
        }
        self.log_sweep(&stats, start);
        Ok(stats)
    }

    fn log_sweep(&self, stats: &SweepStats, start: Instant) {
        info!(
            trials = stats.trials,
            accepted = stats.accepted,
            acceptance = stats.acceptance_ratio(),
            energy = self.energy,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sweep finished"
        );
    }

    /// Transport expansion of `jumps` out of the current state.
    ///
    /// Counts are borrowed for the expansion and left unchanged.
    pub fn expand_transport<K: KineticBarrier + ?Sized>(
        &mut self,
        expander: &TransportExpander<'_, K>,
        jumps: &[Jump],
    ) -> Result<TransportCoefficients, SimulationError> {
        expander.expand_with(&self.state, &mut self.offsite, jumps)
    }
}
