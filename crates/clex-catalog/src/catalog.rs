//! Interaction catalog.
//!
//! Every decorated cluster of every orbit is anchored at every supercell site
//! whose sublattice and candidate species match one of its members. The
//! translated cluster is resolved with periodic wraparound and sorted; that
//! sorted `(site, species)` list is the interaction's identity.
//!
//! Lookup lists are stored flat (CSR): the ids for `(site, species)` live in
//! `list_ids[list_offsets[k]..list_offsets[k + 1]]` with `k = site * S + species`.
//! An interaction appears in a list once per matching member, so offsite
//! bookkeeping stays exact for interactions whose sites collapse under
//! periodic wrapping.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use clex_core::error::CatalogError;
use clex_core::traits::SiteIndexer;
use clex_core::types::{SiteIndex, Species};
use clex_orbit::{ClusterOrbit, SpeciesBudget, VectorBasis};

/// A vector sub-orbit the interaction's owning cluster belongs to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, bincode::Encode, bincode::Decode)]
pub struct VectorRef {
    pub sub_orbit: usize,
    pub direction: [f64; 3],
}

/// A supercell instance of one decorated cluster.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, bincode::Encode, bincode::Decode)]
pub struct Interaction {
    /// Sorted `(site index, species)` members.
    pub members: Vec<(SiteIndex, Species)>,
    /// Orbit the owning cluster belongs to; also its energy coefficient slot.
    pub orbit: usize,
    pub vectors: Vec<VectorRef>,
}

impl Interaction {
    pub fn order(&self) -> usize {
        self.members.len()
    }

    /// Whether periodic wrapping mapped two members onto one site.
    pub fn is_self_overlapping(&self) -> bool {
        self.members.windows(2).any(|w| w[0].0 == w[1].0)
    }

    /// Number of members whose species differs from the occupation.
    pub fn offsite_in(&self, state: &[Species]) -> u32 {
        self.members
            .iter()
            .filter(|&&(site, spec)| state.get(site) != Some(&spec))
            .count() as u32
    }
}

/// All interactions of one supercell, built once and read-only afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, bincode::Encode, bincode::Decode)]
pub struct InteractionCatalog {
    num_sites: usize,
    num_species: usize,
    vacancy: Species,
    num_orbits: usize,
    num_sub_orbits: usize,
    interactions: Vec<Interaction>,
    list_offsets: Vec<usize>,
    list_ids: Vec<usize>,
    max_width: usize,
}

impl InteractionCatalog {
    /// Materialize `orbits` on the supercell described by `indexer`.
    pub fn build<I: SiteIndexer>(
        orbits: &[ClusterOrbit],
        basis: &VectorBasis,
        indexer: &I,
        budget: &SpeciesBudget,
    ) -> Result<Self, CatalogError> {
        let start = Instant::now();
        let num_sites = indexer.num_sites();
        let num_species = budget.num_species();
        validate_orbits(orbits, indexer.num_sublattices(), num_species)?;

        let mut by_key: HashMap<Vec<(SiteIndex, Species)>, usize> = HashMap::new();
        let mut interactions: Vec<Interaction> = Vec::new();
        let mut collisions = 0usize;

        for site in 0..num_sites {
            let anchor = indexer.ci_r(site);
            for species in 0..num_species {
                for (orbit_id, orbit) in orbits.iter().enumerate() {
                    for cluster in orbit.members() {
                        for (member, _) in cluster
                            .pairs()
                            .iter()
                            .filter(|(m, s)| m.sublattice == anchor.sublattice && *s == species)
                        {
                            let shift = anchor.r - member.r;
                            let mut key: Vec<(SiteIndex, Species)> = cluster
                                .translated_pairs(shift)
                                .map(|(s, spec)| (indexer.site_index(&s), spec))
                                .collect();
                            key.sort_unstable();

                            match by_key.get(&key) {
                                Some(&existing) => {
                                    if interactions[existing].orbit != orbit_id {
                                        collisions += 1;
                                    }
                                }
                                None => {
                                    let vectors = basis
                                        .entries_for(cluster)
                                        .iter()
                                        .map(|e| VectorRef {
                                            sub_orbit: e.sub_orbit,
                                            direction: [e.direction.x, e.direction.y, e.direction.z],
                                        })
                                        .collect();
                                    by_key.insert(key.clone(), interactions.len());
                                    interactions.push(Interaction {
                                        members: key,
                                        orbit: orbit_id,
                                        vectors,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        debug!(
            interactions = interactions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "registered interactions"
        );
        if collisions > 0 {
            warn!(collisions, "distinct clusters resolved to the same interaction; first registration kept");
        }

        let (list_offsets, list_ids, max_width) =
            build_lists(&interactions, num_sites, num_species);

        let overlapping = interactions.iter().filter(|i| i.is_self_overlapping()).count();
        if overlapping > 0 {
            warn!(
                overlapping,
                num_sites, "interactions overlap their own periodic images; supercell is small"
            );
        }

        info!(
            num_sites,
            interactions = interactions.len(),
            max_width,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built interaction catalog"
        );

        Ok(Self {
            num_sites,
            num_species,
            vacancy: budget.vacancy(),
            num_orbits: orbits.len(),
            num_sub_orbits: basis.len(),
            interactions,
            list_offsets,
            list_ids,
            max_width,
        })
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_species(&self) -> usize {
        self.num_species
    }

    pub fn vacancy(&self) -> Species {
        self.vacancy
    }

    pub fn num_orbits(&self) -> usize {
        self.num_orbits
    }

    /// Length of the transport `lambda` vectors.
    pub fn num_sub_orbits(&self) -> usize {
        self.num_sub_orbits
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction(&self, id: usize) -> Option<&Interaction> {
        self.interactions.get(id)
    }

    /// Ids of interactions with a member `(site, species)`.
    ///
    /// Out-of-range lookups return an empty list.
    pub fn interactions_at(&self, site: SiteIndex, species: Species) -> &[usize] {
        if site >= self.num_sites || species >= self.num_species {
            return &[];
        }
        let k = site * self.num_species + species;
        &self.list_ids[self.list_offsets[k]..self.list_offsets[k + 1]]
    }

    /// Longest per-(site, species) list.
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn self_overlapping(&self) -> usize {
        self.interactions.iter().filter(|i| i.is_self_overlapping()).count()
    }

    /// Per-interaction energy from per-orbit coefficients.
    pub fn energies(&self, coefficients: &[f64]) -> Result<Vec<f64>, CatalogError> {
        if coefficients.len() != self.num_orbits {
            return Err(CatalogError::CoefficientCount {
                expected: self.num_orbits,
                got: coefficients.len(),
            });
        }
        Ok(self
            .interactions
            .iter()
            .map(|i| coefficients[i.orbit])
            .collect())
    }

    /// Offsite counts of every interaction in `state`.
    pub fn offsite_counts(&self, state: &[Species]) -> Vec<u32> {
        self.interactions.iter().map(|i| i.offsite_in(state)).collect()
    }

    /// BLAKE3 digest over the interaction keys and orbit ids, in id order.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.num_sites as u64).to_le_bytes());
        hasher.update(&(self.num_species as u64).to_le_bytes());
        for interaction in &self.interactions {
            hasher.update(&(interaction.orbit as u64).to_le_bytes());
            hasher.update(&(interaction.members.len() as u64).to_le_bytes());
            for &(site, spec) in &interaction.members {
                hasher.update(&(site as u64).to_le_bytes());
                hasher.update(&(spec as u64).to_le_bytes());
            }
        }
        hasher.finalize().into()
    }
}

fn validate_orbits(
    orbits: &[ClusterOrbit],
    num_sublattices: usize,
    num_species: usize,
) -> Result<(), CatalogError> {
    for cluster in orbits.iter().flat_map(|o| o.members()) {
        for (site, spec) in cluster.pairs() {
            if site.sublattice >= num_sublattices {
                return Err(CatalogError::SublatticeOutOfRange {
                    sublattice: site.sublattice,
                    count: num_sublattices,
                });
            }
            if *spec >= num_species {
                return Err(CatalogError::SpeciesOutOfRange {
                    species: *spec,
                    alphabet: num_species,
                });
            }
        }
    }
    Ok(())
}

/// Derive the per-(site, species) lists from the interactions' own members.
fn build_lists(
    interactions: &[Interaction],
    num_sites: usize,
    num_species: usize,
) -> (Vec<usize>, Vec<usize>, usize) {
    let slots = num_sites * num_species;
    let mut widths = vec![0usize; slots];
    for interaction in interactions {
        for &(site, spec) in &interaction.members {
            widths[site * num_species + spec] += 1;
        }
    }

    let mut offsets = Vec::with_capacity(slots + 1);
    offsets.push(0);
    for w in &widths {
        let last = offsets[offsets.len() - 1];
        offsets.push(last + w);
    }

    let mut ids = vec![0usize; offsets[slots]];
    let mut cursor = offsets[..slots].to_vec();
    for (id, interaction) in interactions.iter().enumerate() {
        for &(site, spec) in &interaction.members {
            let k = site * num_species + spec;
            ids[cursor[k]] = id;
            cursor[k] += 1;
        }
    }

    let max_width = widths.iter().copied().max().unwrap_or(0);
    (offsets, ids, max_width)
}
