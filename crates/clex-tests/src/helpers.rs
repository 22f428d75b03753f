//! Shared lattice fixtures for integration tests.

use nalgebra::Vector3;
use rand::seq::SliceRandom;
use rand::Rng;

use clex_catalog::InteractionCatalog;
use clex_core::supercell::Supercell;
use clex_core::symmetry::SpaceGroup;
use clex_core::traits::SiteIndexer;
use clex_core::types::{LatticeSite, LatticeVector, SiteIndex, Species};
use clex_mc::Jump;
use clex_orbit::{enumerate_orbits, ClusterOrbit, ClusterTemplate, SpeciesBudget, VectorBasis};

pub const A: Species = 0;
pub const B: Species = 1;

/// Everything built for one toy crystal.
pub struct Fixture {
    pub group: SpaceGroup,
    pub budget: SpeciesBudget,
    pub orbits: Vec<ClusterOrbit>,
    pub basis: VectorBasis,
    pub supercell: Supercell,
    pub catalog: InteractionCatalog,
}

fn build(
    group: SpaceGroup,
    budget: SpeciesBudget,
    templates: &[ClusterTemplate],
    supercell: Supercell,
) -> Fixture {
    let (orbits, _) = enumerate_orbits(templates, &budget, &group).unwrap();
    let basis = VectorBasis::build(&orbits, &group);
    let catalog = InteractionCatalog::build(&orbits, &basis, &supercell, &budget).unwrap();
    Fixture {
        group,
        budget,
        orbits,
        basis,
        supercell,
        catalog,
    }
}

/// Two-site crystal: one cell with sublattices 0 and 1, no symmetry, a single
/// pair template across the two sites and species `{A = 0, vacancy = 1}`.
///
/// Orbits come out as `[AA, AV, VA]` (species on sublattice 0 first).
pub fn two_site() -> Fixture {
    let template = ClusterTemplate::pair(
        LatticeSite::new(0, [0, 0, 0]),
        LatticeSite::new(1, [0, 0, 0]),
    )
    .unwrap();
    build(
        SpaceGroup::identity(2),
        SpeciesBudget::new(vec![2, 1], 1).unwrap(),
        &[template],
        Supercell::new([1, 1, 1], 2).unwrap(),
    )
}

/// Simple-cubic `l^3` supercell under `Oh` with species `{A, B, vacancy = 2}`
/// and point, nearest- and next-nearest-neighbour pair and triangle templates.
pub fn simple_cubic(l: i32) -> Fixture {
    let s = |r: [i32; 3]| LatticeSite::new(0, r);
    let templates = vec![
        ClusterTemplate::single(s([0, 0, 0])),
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 0, 0])).unwrap(),
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 1, 0])).unwrap(),
        ClusterTemplate::new(vec![s([0, 0, 0]), s([1, 0, 0]), s([0, 1, 0])]).unwrap(),
    ];
    build(
        SpaceGroup::cubic_oh(),
        SpeciesBudget::new(vec![3, 3, 1], 2).unwrap(),
        &templates,
        Supercell::cubic(l).unwrap(),
    )
}

/// Deterministic, non-trivial coefficients for `n` orbits.
pub fn coefficients(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 37 + 11) % 17) as f64 * 0.05 - 0.4).collect()
}

/// Random A/B occupation with `vacancies` vacancies at random sites.
pub fn random_state<R: Rng>(
    num_sites: usize,
    vacancies: usize,
    vacancy: Species,
    rng: &mut R,
) -> Vec<Species> {
    let mut state: Vec<Species> = (0..num_sites)
        .map(|_| if rng.gen_range(0..2) == 0 { A } else { B })
        .collect();
    let mut sites: Vec<SiteIndex> = (0..num_sites).collect();
    sites.shuffle(rng);
    for &site in sites.iter().take(vacancies) {
        state[site] = vacancy;
    }
    state
}

/// The six nearest-neighbour jumps of the vacancy on `from`.
pub fn nn_jumps(supercell: &Supercell, state: &[Species], from: SiteIndex) -> Vec<Jump> {
    let origin = supercell.ci_r(from);
    [[1, 0, 0], [-1, 0, 0], [0, 1, 0], [0, -1, 0], [0, 0, 1], [0, 0, -1]]
        .into_iter()
        .map(|d| {
            let to = supercell.index(origin.r + LatticeVector(d), origin.sublattice);
            Jump {
                from,
                to,
                species: state[to],
                displacement: Vector3::new(d[0] as f64, d[1] as f64, d[2] as f64),
            }
        })
        .collect()
}

/// Energy summed from scratch over active interactions.
pub fn brute_energy(catalog: &InteractionCatalog, coefficients: &[f64], state: &[Species]) -> f64 {
    catalog
        .interactions()
        .iter()
        .filter(|i| i.offsite_in(state) == 0)
        .map(|i| coefficients[i.orbit])
        .sum()
}
