//! Criterion benchmarks for orbit enumeration and the vector basis.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use clex_core::symmetry::SpaceGroup;
use clex_core::types::LatticeSite;
use clex_orbit::{enumerate_orbits, ClusterTemplate, SpeciesBudget, VectorBasis};

fn templates() -> Vec<ClusterTemplate> {
    let s = |r: [i32; 3]| LatticeSite::new(0, r);
    vec![
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 0, 0])).unwrap(),
        ClusterTemplate::pair(s([0, 0, 0]), s([1, 1, 0])).unwrap(),
        ClusterTemplate::new(vec![s([0, 0, 0]), s([1, 0, 0]), s([0, 1, 0])]).unwrap(),
    ]
}

fn bench_enumerate(c: &mut Criterion) {
    let group = SpaceGroup::cubic_oh();
    let budget = SpeciesBudget::new(vec![3, 3, 1], 2).unwrap();
    let templates = templates();

    c.bench_function("enumerate_ternary_pairs_and_triplet", |b| {
        b.iter(|| enumerate_orbits(black_box(&templates), &budget, &group).unwrap())
    });
}

fn bench_vector_basis(c: &mut Criterion) {
    let group = SpaceGroup::cubic_oh();
    let budget = SpeciesBudget::new(vec![3, 3, 1], 2).unwrap();
    let (orbits, _) = enumerate_orbits(&templates(), &budget, &group).unwrap();

    c.bench_function("vector_basis_ternary", |b| {
        b.iter(|| VectorBasis::build(black_box(&orbits), &group))
    });
}

criterion_group!(benches, bench_enumerate, bench_vector_basis);
criterion_main!(benches);
