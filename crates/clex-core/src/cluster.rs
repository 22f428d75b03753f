//! Translation-invariant species-decorated clusters.
//!
//! A [`DecoratedCluster`] is a set of `(site, species)` pairs brought to a
//! canonical origin by subtracting the floor of the translation centroid.
//! The canonical pairs are kept sorted, so derived equality, ordering and
//! hashing are independent of the order the pairs were supplied in.
//!
//! Rules:
//! 1. Translationally equivalent decorations compare (and hash) equal.
//! 2. Applying a symmetry operation re-canonicalizes the image.
//! 3. Construction fails fast on malformed input.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ClusterError;
use crate::symmetry::SymmetryOp;
use crate::types::{LatticeSite, LatticeVector, Species};

/// A canonical, translation-invariant decorated cluster.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct DecoratedCluster {
    pairs: Vec<(LatticeSite, Species)>,
}

/// Build the canonical form of a decorated cluster.
///
/// The centroid is `sum(R) / n` with floor division per component.
pub fn canonicalize(
    sites: &[LatticeSite],
    species: &[Species],
) -> Result<DecoratedCluster, ClusterError> {
    if sites.len() != species.len() {
        return Err(ClusterError::LengthMismatch {
            sites: sites.len(),
            species: species.len(),
        });
    }
    if sites.is_empty() {
        return Err(ClusterError::Empty);
    }
    let pairs = sites.iter().copied().zip(species.iter().copied()).collect();
    let cluster = DecoratedCluster::from_pairs_unchecked(pairs);
    if let Some(w) = cluster.pairs.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(ClusterError::DuplicateSite(w[0].0.to_string()));
    }
    Ok(cluster)
}

impl DecoratedCluster {
    /// Canonicalize a list of pairs that is already known to be well formed.
    fn from_pairs_unchecked(mut pairs: Vec<(LatticeSite, Species)>) -> Self {
        let n = pairs.len() as i32;
        let sum = pairs
            .iter()
            .fold(LatticeVector::ZERO, |acc, (site, _)| acc + site.r);
        let shift = -sum.div_floor(n);
        for (site, _) in &mut pairs {
            *site = site.translated(shift);
        }
        pairs.sort_unstable();
        Self { pairs }
    }

    /// Build from `(site, species)` pairs.
    pub fn from_pairs(pairs: &[(LatticeSite, Species)]) -> Result<Self, ClusterError> {
        let (sites, species): (Vec<_>, Vec<_>) = pairs.iter().copied().unzip();
        canonicalize(&sites, &species)
    }

    /// Image of this cluster under `op`, species kept, re-canonicalized.
    pub fn apply_symmetry(&self, op: &SymmetryOp) -> DecoratedCluster {
        let pairs = self
            .pairs
            .iter()
            .map(|(site, spec)| (op.apply_site(site), *spec))
            .collect();
        // a symmetry op is a bijection on sites, so no duplicates can appear
        Self::from_pairs_unchecked(pairs)
    }

    /// Canonical `(site, species)` pairs, sorted.
    pub fn pairs(&self) -> &[(LatticeSite, Species)] {
        &self.pairs
    }

    /// Number of sites.
    pub fn order(&self) -> usize {
        self.pairs.len()
    }

    pub fn sites(&self) -> impl Iterator<Item = &LatticeSite> {
        self.pairs.iter().map(|(site, _)| site)
    }

    /// Occupation count per species for an alphabet of size `num_species`.
    pub fn species_counts(&self, num_species: usize) -> Result<Vec<usize>, ClusterError> {
        let mut counts = vec![0; num_species];
        for &(_, spec) in &self.pairs {
            let slot = counts.get_mut(spec).ok_or(ClusterError::SpeciesOutOfRange {
                species: spec,
                alphabet: num_species,
            })?;
            *slot += 1;
        }
        Ok(counts)
    }

    /// The member pairs shifted by `t`, not re-canonicalized.
    pub fn translated_pairs(&self, t: LatticeVector) -> impl Iterator<Item = (LatticeSite, Species)> + '_ {
        self.pairs.iter().map(move |(site, spec)| (site.translated(t), *spec))
    }
}

impl fmt::Display for DecoratedCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (site, spec) in &self.pairs {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{spec}:{site}")?;
            first = false;
        }
        Ok(())
    }
}
