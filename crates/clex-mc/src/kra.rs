//! Kinetic barrier expansion over transition-state clusters.
//!
//! A transition-state cluster is a jump's two endpoint sites plus spectator
//! sites. Clusters are bucketed by the supercell indices of their endpoints;
//! inside a bucket they are split into symmetry sets under the operations that
//! fix both endpoints. Each set decorated with a tuple of non-vacancy species
//! is one coefficient slot, shared by every exchanging species of that jump.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clex_core::error::KraError;
use clex_core::symmetry::{SpaceGroup, SymmetryOp};
use clex_core::traits::{KineticBarrier, SiteIndexer};
use clex_core::types::{LatticeSite, LatticeVector, SiteIndex, Species};
use clex_orbit::{SpeciesAssignments, SpeciesBudget};

/// Jump endpoints plus the spectator sites whose occupation shifts the barrier.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransitionCluster {
    from: LatticeSite,
    to: LatticeSite,
    spectators: Vec<LatticeSite>,
}

impl TransitionCluster {
    /// Endpoints must differ and spectators must be distinct from them and
    /// from each other.
    pub fn new(
        from: LatticeSite,
        to: LatticeSite,
        spectators: Vec<LatticeSite>,
    ) -> Result<Self, KraError> {
        let mut seen = HashSet::with_capacity(spectators.len() + 2);
        for site in [from, to].iter().chain(&spectators) {
            if !seen.insert(*site) {
                return Err(KraError::DegenerateJump(site.to_string()));
            }
        }
        Ok(Self {
            from,
            to,
            spectators,
        })
    }

    pub fn from(&self) -> &LatticeSite {
        &self.from
    }

    pub fn to(&self) -> &LatticeSite {
        &self.to
    }

    pub fn spectators(&self) -> &[LatticeSite] {
        &self.spectators
    }

    fn translated(&self, t: LatticeVector) -> Self {
        Self {
            from: self.from.translated(t),
            to: self.to.translated(t),
            spectators: self.spectators.iter().map(|s| s.translated(t)).collect(),
        }
    }

    fn sites(&self) -> impl Iterator<Item = &LatticeSite> {
        [&self.from, &self.to].into_iter().chain(&self.spectators)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct KraTransition {
    /// Symmetry sets; each member lists spectator site indices in slot order.
    sets: Vec<Vec<Vec<SiteIndex>>>,
    /// `(set, spectator species)` per coefficient slot.
    slots: Vec<(usize, Vec<Species>)>,
}

/// Barrier oracle `E_kra = sum(coefficient[slot] * active members of slot)`.
#[derive(Clone, Debug, PartialEq)]
pub struct KraExpansion {
    transitions: HashMap<(SiteIndex, SiteIndex), KraTransition>,
    num_species: usize,
    vacancy: Species,
}

fn sorted(sites: &[LatticeSite]) -> Vec<LatticeSite> {
    let mut key = sites.to_vec();
    key.sort_unstable();
    key
}

impl KraExpansion {
    pub fn new<I: SiteIndexer>(
        group: &SpaceGroup,
        indexer: &I,
        clusters: &[TransitionCluster],
        budget: &SpeciesBudget,
    ) -> Result<Self, KraError> {
        let count = indexer.num_sublattices();
        if let Some(bad) = clusters
            .iter()
            .flat_map(|c| c.sites())
            .find(|s| s.sublattice >= count)
        {
            return Err(KraError::SiteOutsideSupercell(bad.to_string()));
        }

        let mut order: Vec<(SiteIndex, SiteIndex)> = Vec::new();
        let mut buckets: HashMap<(SiteIndex, SiteIndex), Vec<TransitionCluster>> = HashMap::new();
        for cluster in clusters {
            let key = (indexer.site_index(&cluster.from), indexer.site_index(&cluster.to));
            let bucket = buckets.entry(key).or_default();
            if bucket.is_empty() {
                order.push(key);
                bucket.push(cluster.clone());
            } else {
                // bring every cluster onto the first one's endpoint translation
                let shift = bucket[0].from.r - cluster.from.r;
                bucket.push(cluster.translated(shift));
            }
        }

        let mobile: Vec<Species> = budget.mobile_species().collect();
        let mut transitions = HashMap::with_capacity(order.len());
        for key in order {
            let bucket = &buckets[&key];
            let reference = &bucket[0];
            let stabilizer: Vec<&SymmetryOp> = group
                .ops()
                .iter()
                .filter(|op| {
                    op.apply_site(&reference.from) == reference.from
                        && op.apply_site(&reference.to) == reference.to
                })
                .collect();

            let mut done: HashSet<Vec<LatticeSite>> = HashSet::new();
            let mut sets = Vec::new();
            let mut slots = Vec::new();
            for cluster in bucket {
                if done.contains(&sorted(&cluster.spectators)) {
                    continue;
                }
                let mut members: Vec<Vec<LatticeSite>> = Vec::new();
                let images = std::iter::once(cluster.spectators.clone()).chain(
                    stabilizer
                        .iter()
                        .map(|op| cluster.spectators.iter().map(|s| op.apply_site(s)).collect()),
                );
                for image in images {
                    if done.insert(sorted(&image)) {
                        members.push(image);
                    }
                }

                let set_id = sets.len();
                for tuple in SpeciesAssignments::new(mobile.len(), cluster.spectators.len()) {
                    let species: Vec<Species> = tuple.iter().map(|&i| mobile[i]).collect();
                    if budget.allows(&species) {
                        slots.push((set_id, species));
                    }
                }
                sets.push(
                    members
                        .iter()
                        .map(|m| m.iter().map(|s| indexer.site_index(s)).collect())
                        .collect(),
                );
            }
            debug!(
                from = key.0,
                to = key.1,
                stabilizer = stabilizer.len(),
                sets = sets.len(),
                slots = slots.len(),
                "kra transition"
            );
            transitions.insert(key, KraTransition { sets, slots });
        }

        info!(transitions = transitions.len(), "built kra expansion");
        Ok(Self {
            transitions,
            num_species: budget.num_species(),
            vacancy: budget.vacancy(),
        })
    }

    /// Number of transitions (endpoint pairs) covered.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Endpoint pairs with at least one transition-state cluster.
    pub fn transitions(&self) -> impl Iterator<Item = (SiteIndex, SiteIndex)> + '_ {
        self.transitions.keys().copied()
    }

    /// Coefficient count expected for the jump `from -> to`.
    pub fn num_slots(&self, from: SiteIndex, to: SiteIndex) -> Option<usize> {
        self.transitions.get(&(from, to)).map(|t| t.slots.len())
    }
}

impl KineticBarrier for KraExpansion {
    fn barrier(
        &self,
        from: SiteIndex,
        to: SiteIndex,
        species: Species,
        state: &[Species],
        coefficients: &[f64],
    ) -> Result<f64, KraError> {
        let unknown = KraError::UnknownTransition { from, to, species };
        if species == self.vacancy || species >= self.num_species {
            return Err(unknown);
        }
        let transition = self.transitions.get(&(from, to)).ok_or(unknown)?;
        if coefficients.len() != transition.slots.len() {
            return Err(KraError::CoefficientCount {
                expected: transition.slots.len(),
                got: coefficients.len(),
            });
        }

        let mut e_kra = 0.0;
        for ((set, tuple), coefficient) in transition.slots.iter().zip(coefficients) {
            let on = transition.sets[*set]
                .iter()
                .filter(|member| {
                    member
                        .iter()
                        .zip(tuple)
                        .all(|(&site, &spec)| state.get(site) == Some(&spec))
                })
                .count();
            e_kra += coefficient * on as f64;
        }
        Ok(e_kra)
    }
}
