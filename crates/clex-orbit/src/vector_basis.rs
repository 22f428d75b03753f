//! Symmetry-adapted vector basis over cluster orbits.
//!
//! For each orbit the representative's stabilizer is averaged into a
//! projector onto the directions it leaves fixed. Every eigenvector with
//! eigenvalue 1 spawns a vector sub-orbit: the representative's images under
//! the group, each paired with the correspondingly rotated direction.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clex_core::cluster::DecoratedCluster;
use clex_core::constants::{CARTESIAN_ZERO_TOLERANCE, INVARIANT_EIGENVALUE_TOLERANCE};
use clex_core::symmetry::{SpaceGroup, SymmetryOp};

use crate::enumerate::ClusterOrbit;

/// One cluster's membership in a vector sub-orbit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VectorEntry {
    /// Global sub-orbit id.
    pub sub_orbit: usize,
    pub direction: Vector3<f64>,
}

/// Clusters of one orbit paired with the image of one invariant direction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VectorSubOrbit {
    pub orbit: usize,
    pub members: Vec<(DecoratedCluster, Vector3<f64>)>,
}

/// All vector sub-orbits of an orbit list.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VectorBasis {
    sub_orbits: Vec<VectorSubOrbit>,
    /// `offsets[o]..offsets[o + 1]` are the sub-orbit ids of orbit `o`.
    offsets: Vec<usize>,
    by_cluster: HashMap<DecoratedCluster, Vec<VectorEntry>>,
}

/// Operations that map `cluster` onto itself, translations included.
pub fn stabilizer<'g>(cluster: &DecoratedCluster, group: &'g SpaceGroup) -> Vec<&'g SymmetryOp> {
    group
        .ops()
        .iter()
        .filter(|op| cluster.apply_symmetry(op) == *cluster)
        .collect()
}

/// Unit directions left fixed by every operation in `ops`.
///
/// Returns an orthonormal set; tiny components are zeroed and each vector's
/// first nonzero component is made positive.
pub fn invariant_directions(ops: &[&SymmetryOp]) -> Vec<Vector3<f64>> {
    if ops.is_empty() {
        return Vec::new();
    }
    let sum = ops
        .iter()
        .fold(Matrix3::<f64>::zeros(), |acc, op| acc + op.cart_rotation());
    let avg = sum / ops.len() as f64;
    let projector = (avg + avg.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(projector);
    let mut out = Vec::new();
    for (i, value) in eigen.eigenvalues.iter().enumerate() {
        if (value - 1.0).abs() > INVARIANT_EIGENVALUE_TOLERANCE {
            continue;
        }
        let mut v: Vector3<f64> = eigen.eigenvectors.column(i).into_owned();
        let norm = v.norm();
        if norm < CARTESIAN_ZERO_TOLERANCE {
            continue;
        }
        v /= norm;
        for c in v.iter_mut() {
            if c.abs() < CARTESIAN_ZERO_TOLERANCE {
                *c = 0.0;
            }
        }
        if v.iter().find(|c| **c != 0.0).is_some_and(|c| *c < 0.0) {
            v = -v;
        }
        out.push(v);
    }
    out
}

impl VectorBasis {
    /// Build the vector basis for `orbits` under `group`.
    pub fn build(orbits: &[ClusterOrbit], group: &SpaceGroup) -> Self {
        let start = Instant::now();
        let mut basis = VectorBasis {
            offsets: vec![0],
            ..VectorBasis::default()
        };

        for (orbit_id, orbit) in orbits.iter().enumerate() {
            let rep = orbit.representative();
            let stab = stabilizer(rep, group);
            let directions = invariant_directions(&stab);
            debug!(
                orbit = orbit_id,
                stabilizer = stab.len(),
                directions = directions.len(),
                "vector basis for orbit"
            );

            for dir in directions {
                let sub_id = basis.sub_orbits.len();
                let mut seen = HashSet::with_capacity(orbit.len());
                seen.insert(rep.clone());
                let mut members = vec![(rep.clone(), dir)];
                for op in group.ops() {
                    let image = rep.apply_symmetry(op);
                    if seen.insert(image.clone()) {
                        members.push((image, op.rotate(&dir)));
                    }
                }
                for (cluster, direction) in &members {
                    basis
                        .by_cluster
                        .entry(cluster.clone())
                        .or_default()
                        .push(VectorEntry {
                            sub_orbit: sub_id,
                            direction: *direction,
                        });
                }
                basis.sub_orbits.push(VectorSubOrbit {
                    orbit: orbit_id,
                    members,
                });
            }
            basis.offsets.push(basis.sub_orbits.len());
        }

        info!(
            orbits = orbits.len(),
            sub_orbits = basis.sub_orbits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built vector basis"
        );
        basis
    }

    /// Total number of sub-orbits across all orbits.
    pub fn len(&self) -> usize {
        self.sub_orbits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_orbits.is_empty()
    }

    pub fn sub_orbits(&self) -> &[VectorSubOrbit] {
        &self.sub_orbits
    }

    /// Number of orbits the basis was built for.
    pub fn num_orbits(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of sub-orbits recorded for `orbit` (zero when out of range).
    pub fn sub_orbit_count(&self, orbit: usize) -> usize {
        self.sub_orbits_of(orbit).len()
    }

    pub fn sub_orbits_of(&self, orbit: usize) -> &[VectorSubOrbit] {
        match (self.offsets.get(orbit), self.offsets.get(orbit + 1)) {
            (Some(&lo), Some(&hi)) => &self.sub_orbits[lo..hi],
            _ => &[],
        }
    }

    /// Vector entries owned by `cluster`; empty for clusters with none.
    pub fn entries_for(&self, cluster: &DecoratedCluster) -> &[VectorEntry] {
        self.by_cluster
            .get(cluster)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::{enumerate_orbits, ClusterTemplate, SpeciesBudget};
    use clex_core::types::LatticeSite;

    const EPS: f64 = 1e-9;

    fn site(r: [i32; 3]) -> LatticeSite {
        LatticeSite::new(0, r)
    }

    fn cubic_pair_orbits() -> Vec<ClusterOrbit> {
        // species A = 0, V = 1
        let budget = SpeciesBudget::new(vec![2, 1], 1).unwrap();
        let template = ClusterTemplate::pair(site([0, 0, 0]), site([1, 0, 0])).unwrap();
        enumerate_orbits(&[template], &budget, &SpaceGroup::cubic_oh())
            .unwrap()
            .0
    }

    // --- invariant_directions ---

    #[test]
    fn identity_fixes_every_direction() {
        let g = SpaceGroup::identity(1);
        let ops: Vec<_> = g.ops().iter().collect();
        let dirs = invariant_directions(&ops);
        assert_eq!(dirs.len(), 3);
        for d in &dirs {
            assert!((d.norm() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn full_cubic_group_fixes_nothing() {
        let g = SpaceGroup::cubic_oh();
        let ops: Vec<_> = g.ops().iter().collect();
        assert!(invariant_directions(&ops).is_empty());
        assert!(invariant_directions(&[]).is_empty());
    }

    // --- stabilizer ---

    #[test]
    fn stabilizer_sizes_for_nn_pairs() {
        let orbits = cubic_pair_orbits();
        let g = SpaceGroup::cubic_oh();
        // AA keeps D4h, AV keeps C4v
        assert_eq!(stabilizer(orbits[0].representative(), &g).len(), 16);
        assert_eq!(stabilizer(orbits[1].representative(), &g).len(), 8);
    }

    // --- VectorBasis ---

    #[test]
    fn homogeneous_pair_has_no_vector() {
        let orbits = cubic_pair_orbits();
        let basis = VectorBasis::build(&orbits, &SpaceGroup::cubic_oh());
        assert_eq!(basis.sub_orbit_count(0), 0);
        assert!(basis.entries_for(orbits[0].representative()).is_empty());
    }

    #[test]
    fn mixed_pair_points_along_bond() {
        let orbits = cubic_pair_orbits();
        let basis = VectorBasis::build(&orbits, &SpaceGroup::cubic_oh());
        assert_eq!(basis.num_orbits(), 2);
        assert_eq!(basis.sub_orbit_count(1), 1);
        assert_eq!(basis.len(), 1);

        let sub = &basis.sub_orbits_of(1)[0];
        assert_eq!(sub.orbit, 1);
        assert_eq!(sub.members.len(), orbits[1].len());
        let (rep, dir) = &sub.members[0];
        assert_eq!(rep, orbits[1].representative());
        assert!((dir - Vector3::new(1.0, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn directions_follow_the_vacancy_end() {
        let orbits = cubic_pair_orbits();
        let basis = VectorBasis::build(&orbits, &SpaceGroup::cubic_oh());
        for (cluster, dir) in &basis.sub_orbits_of(1)[0].members {
            // vector from the A site to the V site, in lattice units
            let a = cluster.pairs().iter().find(|(_, s)| *s == 0).unwrap().0.r.0;
            let v = cluster.pairs().iter().find(|(_, s)| *s == 1).unwrap().0.r.0;
            let bond = Vector3::new(
                (v[0] - a[0]) as f64,
                (v[1] - a[1]) as f64,
                (v[2] - a[2]) as f64,
            );
            assert!((dir - bond).norm() < EPS, "{cluster}: {dir:?} vs {bond:?}");
        }
    }

    #[test]
    fn entries_indexed_by_owning_cluster() {
        let orbits = cubic_pair_orbits();
        let basis = VectorBasis::build(&orbits, &SpaceGroup::cubic_oh());
        for member in orbits[1].members() {
            let entries = basis.entries_for(member);
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].sub_orbit, 0);
        }
    }

    #[test]
    fn out_of_range_orbit_is_empty() {
        let basis = VectorBasis::build(&cubic_pair_orbits(), &SpaceGroup::cubic_oh());
        assert!(basis.sub_orbits_of(99).is_empty());
        assert_eq!(basis.sub_orbit_count(99), 0);
    }

    #[test]
    fn identity_group_point_cluster_spans_space() {
        let budget = SpeciesBudget::new(vec![1], 0).unwrap();
        let template = ClusterTemplate::single(site([0, 0, 0]));
        let (orbits, _) =
            enumerate_orbits(&[template], &budget, &SpaceGroup::identity(1)).unwrap();
        let basis = VectorBasis::build(&orbits, &SpaceGroup::identity(1));
        assert_eq!(basis.sub_orbit_count(0), 3);
        assert_eq!(basis.entries_for(orbits[0].representative()).len(), 3);
    }
}
