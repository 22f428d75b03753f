//! Simple-cubic demo pipeline: enumerate, build the catalog, sample and expand.

use anyhow::{ensure, Context, Result};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use clex_catalog::InteractionCatalog;
use clex_core::supercell::Supercell;
use clex_core::symmetry::SpaceGroup;
use clex_core::traits::{ConstantBarrier, SiteIndexer};
use clex_core::types::{LatticeSite, LatticeVector, SiteIndex, Species};
use clex_mc::{Jump, KraCoefficients, MonteCarloEngine, TransportAccumulator, TransportExpander};
use clex_orbit::{enumerate_orbits, ClusterTemplate, SpeciesBudget, VectorBasis};

use crate::config::SimulationConfig;

const NEIGHBOURS: [[i32; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// Summary printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub orbits: usize,
    pub clusters: usize,
    pub sub_orbits: usize,
    pub interactions: usize,
    pub max_width: usize,
    pub fingerprint: String,
    pub trials: u64,
    pub accepted: u64,
    pub acceptance_ratio: f64,
    pub final_energy: f64,
    pub recomputed_energy: f64,
    pub transport_samples: u64,
    pub wbar: Vec<Vec<f64>>,
    pub bbar: Vec<f64>,
}

fn templates(triplets: bool) -> Result<Vec<ClusterTemplate>> {
    let s = |r: [i32; 3]| LatticeSite::new(0, r);
    let mut out = vec![
        ClusterTemplate::single(s([0, 0, 0])),
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 0, 0]))?,
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 1, 0]))?,
    ];
    if triplets {
        out.push(ClusterTemplate::new(vec![s([0, 0, 0]), s([1, 0, 0]), s([0, 1, 0])])?);
    }
    Ok(out)
}

fn initial_state<R: Rng>(
    num_sites: usize,
    budget: &SpeciesBudget,
    vacancies: usize,
    rng: &mut R,
) -> Result<Vec<Species>> {
    ensure!(
        vacancies <= num_sites,
        "{vacancies} vacancies do not fit in {num_sites} sites"
    );
    let mobile: Vec<Species> = budget.mobile_species().collect();
    ensure!(!mobile.is_empty(), "no mobile species to fill the lattice with");

    let mut state: Vec<Species> = (0..num_sites)
        .map(|_| mobile[rng.gen_range(0..mobile.len())])
        .collect();
    let mut sites: Vec<SiteIndex> = (0..num_sites).collect();
    sites.shuffle(rng);
    for &site in sites.iter().take(vacancies) {
        state[site] = budget.vacancy();
    }
    Ok(state)
}

/// Nearest-neighbour jumps of every vacancy onto a non-vacancy site.
fn vacancy_jumps(supercell: &Supercell, state: &[Species], vacancy: Species) -> Vec<Jump> {
    let mut jumps = Vec::new();
    for (from, _) in state.iter().enumerate().filter(|(_, s)| **s == vacancy) {
        let origin = supercell.ci_r(from);
        for d in NEIGHBOURS {
            let to = supercell.index(origin.r + LatticeVector(d), origin.sublattice);
            if state[to] == vacancy {
                continue;
            }
            jumps.push(Jump {
                from,
                to,
                species: state[to],
                displacement: Vector3::new(d[0] as f64, d[1] as f64, d[2] as f64),
            });
        }
    }
    jumps
}

/// Run the whole pipeline described by `cfg`.
pub fn run(cfg: &SimulationConfig) -> Result<Report> {
    let group = SpaceGroup::cubic_oh();
    let budget = SpeciesBudget::new(cfg.species_max.clone(), cfg.vacancy)
        .context("invalid species budget")?;
    let (orbits, stats) = enumerate_orbits(&templates(cfg.triplets)?, &budget, &group)
        .context("orbit enumeration failed")?;
    let basis = VectorBasis::build(&orbits, &group);
    let supercell = Supercell::cubic(cfg.supercell).context("invalid supercell")?;
    let catalog = InteractionCatalog::build(&orbits, &basis, &supercell, &budget)
        .context("catalog construction failed")?;
    let fingerprint = hex::encode(catalog.fingerprint());
    info!(
        orbits = stats.orbits,
        sub_orbits = basis.len(),
        interactions = catalog.len(),
        fingerprint = %fingerprint,
        "Catalog ready"
    );

    if let Some(path) = &cfg.catalog_out {
        catalog
            .save(path)
            .with_context(|| format!("failed to write catalog to {}", path.display()))?;
        info!(path = %path.display(), "Catalog saved");
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let coefficients = if cfg.coefficients.is_empty() {
        (0..catalog.num_orbits())
            .map(|_| rng.gen_range(-0.1..0.1))
            .collect()
    } else {
        cfg.coefficients.clone()
    };

    let state = initial_state(catalog.num_sites(), &budget, cfg.vacancies, &mut rng)?;
    let mut engine = MonteCarloEngine::new(&catalog, &coefficients, state, cfg.beta)
        .context("failed to start Monte Carlo")?;

    let barrier = ConstantBarrier(cfg.kra_barrier);
    let kra = KraCoefficients::new();
    let expander = TransportExpander::new(&catalog, &coefficients, &barrier, &kra, cfg.beta)
        .context("failed to set up transport expansion")?;
    let mut accumulator = TransportAccumulator::new(catalog.num_sub_orbits());

    let (mut trials, mut accepted) = (0u64, 0u64);
    for sample in 0..cfg.samples {
        let sweep = engine.sweep_random(cfg.trials, &mut rng)?;
        trials += sweep.trials;
        accepted += sweep.accepted;

        let jumps = vacancy_jumps(&supercell, engine.state(), budget.vacancy());
        let tensors = engine.expand_transport(&expander, &jumps)?;
        accumulator.add(&tensors)?;
        info!(
            sample,
            energy = engine.total_energy(),
            acceptance = sweep.acceptance_ratio(),
            jumps = jumps.len(),
            "Sample collected"
        );
    }

    let (wbar, bbar) = match accumulator.mean() {
        Some((w, b)) => (
            w.row_iter().map(|row| row.iter().copied().collect()).collect(),
            b.iter().copied().collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    Ok(Report {
        orbits: orbits.len(),
        clusters: stats.clusters,
        sub_orbits: catalog.num_sub_orbits(),
        interactions: catalog.len(),
        max_width: catalog.max_width(),
        fingerprint,
        trials,
        accepted,
        acceptance_ratio: if trials == 0 {
            0.0
        } else {
            accepted as f64 / trials as f64
        },
        final_energy: engine.total_energy(),
        recomputed_energy: engine.recompute_energy(),
        transport_samples: accumulator.samples(),
        wbar,
        bbar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SimulationConfig {
        SimulationConfig {
            supercell: 3,
            trials: 200,
            samples: 3,
            ..SimulationConfig::default()
        }
    }

    // --- run ---

    #[test]
    fn run_produces_consistent_report() {
        let report = run(&small()).unwrap();
        assert_eq!(report.trials, 600);
        assert_eq!(report.transport_samples, 3);
        assert_eq!(report.fingerprint.len(), 64);
        assert_eq!(report.wbar.len(), report.sub_orbits);
        assert_eq!(report.bbar.len(), report.sub_orbits);
        assert!((report.final_energy - report.recomputed_energy).abs() < 1e-9);
    }

    #[test]
    fn run_is_reproducible_for_a_seed() {
        let a = run(&small()).unwrap();
        let b = run(&small()).unwrap();
        assert_eq!(a.final_energy, b.final_energy);
        assert_eq!(a.accepted, b.accepted);
    }

    #[test]
    fn wrong_coefficient_count_is_reported() {
        let cfg = SimulationConfig {
            coefficients: vec![0.1],
            ..small()
        };
        assert!(run(&cfg).is_err());
    }

    #[test]
    fn too_many_vacancies_is_reported() {
        let cfg = SimulationConfig {
            supercell: 1,
            vacancies: 2,
            ..small()
        };
        assert!(run(&cfg).is_err());
    }

    #[test]
    fn catalog_is_written_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.catalog");
        let cfg = SimulationConfig {
            catalog_out: Some(path.clone()),
            samples: 0,
            ..small()
        };
        let report = run(&cfg).unwrap();
        let loaded = InteractionCatalog::load(&path).unwrap();
        assert_eq!(hex::encode(loaded.fingerprint()), report.fingerprint);
        assert!(report.wbar.is_empty());
    }

    // --- jumps ---

    #[test]
    fn vacancy_jumps_skip_vacant_neighbours() {
        let sc = Supercell::cubic(3).unwrap();
        let mut state = vec![0; sc.num_sites()];
        let a = sc.index(LatticeVector([0, 0, 0]), 0);
        let b = sc.index(LatticeVector([1, 0, 0]), 0);
        state[a] = 2;
        state[b] = 2;
        let jumps = vacancy_jumps(&sc, &state, 2);
        assert_eq!(jumps.len(), 10);
        assert!(jumps.iter().all(|j| state[j.to] != 2));
    }
}
