//! Pipeline-wide invariants of the cluster-expansion engine.
//!
//! Covered:
//! - Orbit closure and disjointness under the full cubic group
//! - Canonicalization idempotence, op/inverse and composition
//! - Offsite integrity and energy conservation across random sweeps
//! - The two-site swap scenario and detailed balance
//! - Catalog persistence preserving the fingerprint

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use clex_catalog::InteractionCatalog;
use clex_core::cluster::{canonicalize, DecoratedCluster};
use clex_core::symmetry::SpaceGroup;
use clex_core::types::LatticeSite;
use clex_mc::MonteCarloEngine;
use clex_tests::helpers::*;

// ---------------------------------------------------------------------------
// Orbits
// ---------------------------------------------------------------------------

#[test]
fn orbits_are_closed_and_disjoint() {
    let fx = simple_cubic(3);
    let mut seen: HashSet<&DecoratedCluster> = HashSet::new();
    for orbit in &fx.orbits {
        let members: HashSet<_> = orbit.members().iter().collect();
        for m in orbit.members() {
            assert!(seen.insert(m), "cluster {m} in two orbits");
            for op in fx.group.ops() {
                assert!(members.contains(&m.apply_symmetry(op)));
            }
        }
    }
}

#[test]
fn orbit_members_respect_budget() {
    let fx = simple_cubic(3);
    for orbit in &fx.orbits {
        for m in orbit.members() {
            let counts = m.species_counts(fx.budget.num_species()).unwrap();
            for (spec, count) in counts.into_iter().enumerate() {
                assert!(count <= fx.budget.max_count(spec));
            }
        }
    }
}

fn arb_cluster() -> impl Strategy<Value = DecoratedCluster> {
    prop::collection::btree_set((-3i32..3, -3i32..3, -3i32..3), 1..5).prop_flat_map(|raw| {
        let n = raw.len();
        (Just(raw), prop::collection::vec(0usize..3, n)).prop_map(|(raw, species)| {
            let sites: Vec<_> = raw
                .into_iter()
                .map(|(x, y, z)| LatticeSite::new(0, [x, y, z]))
                .collect();
            canonicalize(&sites, &species).unwrap()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn canonical_form_is_idempotent(c in arb_cluster()) {
        prop_assert_eq!(DecoratedCluster::from_pairs(c.pairs()).unwrap(), c);
    }

    #[test]
    fn op_then_inverse_returns_cluster(c in arb_cluster(), i in 0usize..48) {
        let g = SpaceGroup::cubic_oh();
        let op = &g.ops()[i];
        prop_assert_eq!(c.apply_symmetry(op).apply_symmetry(&op.inverse()), c);
    }

    #[test]
    fn composition_matches_sequential_application(
        c in arb_cluster(),
        i in 0usize..48,
        j in 0usize..48,
    ) {
        let g = SpaceGroup::cubic_oh();
        let (a, b) = (&g.ops()[i], &g.ops()[j]);
        prop_assert_eq!(
            c.apply_symmetry(&a.compose(b)),
            c.apply_symmetry(b).apply_symmetry(a)
        );
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo invariants
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn offsite_and_energy_survive_sweeps(
        seed in any::<u64>(),
        beta in 0.0f64..5.0,
        trials in 1u64..400,
    ) {
        let fx = simple_cubic(3);
        let coeffs = coefficients(fx.catalog.num_orbits());
        let mut rng = StdRng::seed_from_u64(seed);
        let state = random_state(fx.catalog.num_sites(), 1, fx.budget.vacancy(), &mut rng);
        let mut engine = MonteCarloEngine::new(&fx.catalog, &coeffs, state, beta).unwrap();
        engine.sweep_random(trials, &mut rng).unwrap();

        prop_assert!(engine.verify_offsite());
        let brute = brute_energy(&fx.catalog, &coeffs, engine.state());
        prop_assert!((engine.total_energy() - brute).abs() < 1e-9);
        prop_assert!((engine.recompute_energy() - brute).abs() < 1e-9);
    }
}

#[test]
fn long_sweep_keeps_composition() {
    let fx = simple_cubic(4);
    let coeffs = coefficients(fx.catalog.num_orbits());
    let mut rng = StdRng::seed_from_u64(99);
    let state = random_state(fx.catalog.num_sites(), 2, fx.budget.vacancy(), &mut rng);
    let mut before = state.clone();
    let mut engine = MonteCarloEngine::new(&fx.catalog, &coeffs, state, 3.0).unwrap();
    let stats = engine.sweep_random(20_000, &mut rng).unwrap();
    assert_eq!(stats.trials, 20_000);

    let mut after = engine.state().to_vec();
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(before, after);
    assert!(engine.verify_offsite());
}

// ---------------------------------------------------------------------------
// Two-site scenario
// ---------------------------------------------------------------------------

const V2: usize = 1;
// orbits are [AA, AV, VA]; only A on sublattice 0 next to V costs energy
const TWO_SITE_COEFFS: [f64; 3] = [0.0, 1.0, 0.0];

#[test]
fn two_site_swap_reports_minus_e() {
    let fx = two_site();
    assert_eq!(fx.orbits.len(), 3);
    let mut engine =
        MonteCarloEngine::new(&fx.catalog, &TWO_SITE_COEFFS, vec![A, V2], 1.0).unwrap();
    assert_eq!(engine.total_energy(), 1.0);

    let out = engine.trial(0, 1, 0.5).unwrap();
    assert_eq!(out.delta_e, -1.0);
    assert!(out.accepted);
    assert_eq!(engine.state(), &[V2, A]);
    assert_eq!(engine.total_energy(), 0.0);
    assert!(engine.verify_offsite());
}

#[test]
fn zero_temperature_never_climbs() {
    let fx = two_site();
    let mut engine =
        MonteCarloEngine::new(&fx.catalog, &TWO_SITE_COEFFS, vec![V2, A], f64::INFINITY).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let stats = engine.sweep_random(1_000, &mut rng).unwrap();
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.rejected, 1_000);
    assert_eq!(engine.state(), &[V2, A]);
    assert!(engine.verify_offsite());
}

#[test]
fn two_state_detailed_balance() {
    let fx = two_site();
    let beta = 1.0;
    let mut engine =
        MonteCarloEngine::new(&fx.catalog, &TWO_SITE_COEFFS, vec![V2, A], beta).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let (mut high, mut low) = (0u64, 0u64);
    for _ in 0..200_000 {
        engine.trial(0, 1, rng.gen_range(0.0..1.0)).unwrap();
        if engine.total_energy() > 0.5 {
            high += 1;
        } else {
            low += 1;
        }
    }
    let ratio = high as f64 / low as f64;
    let expected = (-beta * 1.0f64).exp();
    assert!((ratio - expected).abs() < 0.01, "ratio {ratio}, expected {expected}");
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn catalog_round_trip_preserves_fingerprint() {
    let fx = simple_cubic(3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("l3.catalog");
    fx.catalog.save(&path).unwrap();
    let loaded = InteractionCatalog::load(&path).unwrap();
    assert_eq!(loaded.fingerprint(), fx.catalog.fingerprint());
    assert_eq!(loaded.max_width(), fx.catalog.max_width());

    // a loaded catalog drives the engine identically
    let coeffs = coefficients(fx.catalog.num_orbits());
    let mut rng = StdRng::seed_from_u64(5);
    let state = random_state(fx.catalog.num_sites(), 1, fx.budget.vacancy(), &mut rng);
    let a = MonteCarloEngine::new(&fx.catalog, &coeffs, state.clone(), 1.0).unwrap();
    let b = MonteCarloEngine::new(&loaded, &coeffs, state, 1.0).unwrap();
    assert_eq!(a.total_energy(), b.total_energy());
}
