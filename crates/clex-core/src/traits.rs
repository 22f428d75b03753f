//! Trait interfaces for the engine's external collaborators.
//!
//! - [`SiteIndexer`]: periodic supercell site indexing ([`crate::supercell::Supercell`] implements)
//! - [`KineticBarrier`]: kinetic (KRA) barrier oracle for vacancy jumps

use crate::error::KraError;
use crate::types::{LatticeSite, LatticeVector, SiteIndex, Species};

/// Periodic indexing of lattice sites into a finite supercell.
pub trait SiteIndexer {
    /// Total number of sites in the supercell.
    fn num_sites(&self) -> usize;

    /// Number of sublattices (basis sites) per unit cell.
    fn num_sublattices(&self) -> usize;

    /// Supercell index of `(R, sublattice)`, wrapping `R` periodically.
    fn index(&self, r: LatticeVector, sublattice: usize) -> SiteIndex;

    /// Inverse of [`index`](Self::index): the in-cell representative of a site.
    fn ci_r(&self, index: SiteIndex) -> LatticeSite;

    /// Index of a lattice site. Default delegates to [`index`](Self::index).
    fn site_index(&self, site: &LatticeSite) -> SiteIndex {
        self.index(site.r, site.sublattice)
    }
}

/// Kinetic activation barrier for a vacancy exchange in a given state.
pub trait KineticBarrier {
    /// KRA energy for the jump `from -> to` exchanging `species` with the vacancy.
    ///
    /// `coefficients` are the fitted KRA coefficients for this transition;
    /// implementations must reject a count that does not match their layout.
    fn barrier(
        &self,
        from: SiteIndex,
        to: SiteIndex,
        species: Species,
        state: &[Species],
        coefficients: &[f64],
    ) -> Result<f64, KraError>;
}

/// A barrier that is the same for every jump.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantBarrier(pub f64);

impl KineticBarrier for ConstantBarrier {
    fn barrier(
        &self,
        _from: SiteIndex,
        _to: SiteIndex,
        _species: Species,
        _state: &[Species],
        _coefficients: &[f64],
    ) -> Result<f64, KraError> {
        Ok(self.0)
    }
}
