//! Symmetry-distinct decorated-cluster orbits.
//!
//! Every geometric template is decorated with every species assignment
//! (`S^order` of them, last site varying fastest). An assignment is kept only
//! if its canonical cluster has not been seen before and its per-species
//! counts fit the budget; the kept cluster is then closed under the group to
//! form an orbit. Budget overflow filters, it never fails.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clex_core::cluster::{canonicalize, DecoratedCluster};
use clex_core::error::ClusterError;
use clex_core::symmetry::SpaceGroup;
use clex_core::types::{LatticeSite, Species};

/// A geometric cluster: sites only, no species.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterTemplate {
    sites: Vec<LatticeSite>,
}

impl ClusterTemplate {
    /// Fails on an empty or repeated site list.
    pub fn new(sites: Vec<LatticeSite>) -> Result<Self, ClusterError> {
        // canonicalize performs the structural checks
        canonicalize(&sites, &vec![0; sites.len()])?;
        Ok(Self { sites })
    }

    pub fn single(site: LatticeSite) -> Self {
        Self { sites: vec![site] }
    }

    pub fn pair(a: LatticeSite, b: LatticeSite) -> Result<Self, ClusterError> {
        Self::new(vec![a, b])
    }

    pub fn sites(&self) -> &[LatticeSite] {
        &self.sites
    }

    pub fn order(&self) -> usize {
        self.sites.len()
    }
}

/// Per-species upper bounds on how many sites of a cluster a species may take.
///
/// One species is the vacancy; it is budgeted like any other.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpeciesBudget {
    max_counts: Vec<usize>,
    vacancy: Species,
}

impl SpeciesBudget {
    pub fn new(max_counts: Vec<usize>, vacancy: Species) -> Result<Self, ClusterError> {
        if max_counts.is_empty() {
            return Err(ClusterError::EmptyAlphabet);
        }
        if vacancy >= max_counts.len() {
            return Err(ClusterError::SpeciesOutOfRange {
                species: vacancy,
                alphabet: max_counts.len(),
            });
        }
        Ok(Self { max_counts, vacancy })
    }

    /// Alphabet size `S`.
    pub fn num_species(&self) -> usize {
        self.max_counts.len()
    }

    pub fn vacancy(&self) -> Species {
        self.vacancy
    }

    pub fn max_count(&self, species: Species) -> usize {
        self.max_counts.get(species).copied().unwrap_or(0)
    }

    /// Every species other than the vacancy, in label order.
    pub fn mobile_species(&self) -> impl Iterator<Item = Species> + '_ {
        (0..self.num_species()).filter(move |&s| s != self.vacancy)
    }

    /// Whether the counts of an assignment stay within every species' budget.
    pub fn allows(&self, assignment: &[Species]) -> bool {
        let mut counts = vec![0usize; self.num_species()];
        for &s in assignment {
            match counts.get_mut(s) {
                Some(c) => *c += 1,
                None => return false,
            }
        }
        counts
            .iter()
            .zip(&self.max_counts)
            .all(|(have, max)| have <= max)
    }
}

/// Odometer over all `base^len` species tuples, last position fastest.
#[derive(Debug, Clone)]
pub struct SpeciesAssignments {
    current: Vec<Species>,
    base: usize,
    done: bool,
}

impl SpeciesAssignments {
    pub fn new(base: usize, len: usize) -> Self {
        Self {
            current: vec![0; len],
            base,
            done: base == 0 && len > 0,
        }
    }
}

impl Iterator for SpeciesAssignments {
    type Item = Vec<Species>;

    fn next(&mut self) -> Option<Vec<Species>> {
        if self.done {
            return None;
        }
        let out = self.current.clone();
        let mut pos = self.current.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.current[pos] += 1;
            if self.current[pos] < self.base {
                break;
            }
            self.current[pos] = 0;
        }
        Some(out)
    }
}

/// Decorated clusters closed under the full group; the first member is the
/// cluster the orbit was generated from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterOrbit {
    members: Vec<DecoratedCluster>,
}

impl ClusterOrbit {
    /// Close `seed` under every operation of `group`.
    pub fn generate(seed: DecoratedCluster, group: &SpaceGroup) -> Self {
        let mut seen = HashSet::with_capacity(group.len());
        seen.insert(seed.clone());
        let mut members = vec![seed];
        for op in group.ops() {
            let image = members[0].apply_symmetry(op);
            if seen.insert(image.clone()) {
                members.push(image);
            }
        }
        Self { members }
    }

    pub fn representative(&self) -> &DecoratedCluster {
        &self.members[0]
    }

    pub fn members(&self) -> &[DecoratedCluster] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of sites of every member.
    pub fn order(&self) -> usize {
        self.representative().order()
    }
}

/// Counters collected while enumerating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    pub templates: usize,
    pub assignments: usize,
    pub duplicates: usize,
    pub over_budget: usize,
    pub orbits: usize,
    pub clusters: usize,
}

/// Enumerate all symmetry-distinct decorated-cluster orbits.
///
/// Templates are processed in the order given; callers usually group them by
/// order so lower-order orbits get lower ids.
pub fn enumerate_orbits(
    templates: &[ClusterTemplate],
    budget: &SpeciesBudget,
    group: &SpaceGroup,
) -> Result<(Vec<ClusterOrbit>, EnumerationStats), ClusterError> {
    let start = Instant::now();
    let count = group.num_sublattices();
    if let Some(bad) = templates
        .iter()
        .flat_map(|t| t.sites())
        .find(|s| s.sublattice >= count)
    {
        return Err(ClusterError::SublatticeOutOfRange {
            sublattice: bad.sublattice,
            count,
        });
    }

    let mut seen: HashSet<DecoratedCluster> = HashSet::new();
    let mut orbits = Vec::new();
    let mut stats = EnumerationStats {
        templates: templates.len(),
        ..EnumerationStats::default()
    };

    for template in templates {
        for assignment in SpeciesAssignments::new(budget.num_species(), template.order()) {
            stats.assignments += 1;
            let cluster = canonicalize(template.sites(), &assignment)?;
            if seen.contains(&cluster) {
                stats.duplicates += 1;
                continue;
            }
            if !budget.allows(&assignment) {
                stats.over_budget += 1;
                continue;
            }
            let orbit = ClusterOrbit::generate(cluster, group);
            seen.extend(orbit.members().iter().cloned());
            stats.clusters += orbit.len();
            orbits.push(orbit);
        }
        debug!(order = template.order(), orbits = orbits.len(), "template decorated");
    }

    stats.orbits = orbits.len();
    info!(
        orbits = stats.orbits,
        clusters = stats.clusters,
        over_budget = stats.over_budget,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "enumerated cluster orbits"
    );
    Ok((orbits, stats))
}
