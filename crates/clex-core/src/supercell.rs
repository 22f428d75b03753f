//! Diagonal periodic supercell.
//!
//! Sites are numbered sublattice-major: all cells of sublattice 0 first, then
//! sublattice 1, and so on. Within a sublattice the cell `(x, y, z)` maps to
//! `(x * ny + y) * nz + z` after periodic wrapping.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::traits::SiteIndexer;
use crate::types::{LatticeSite, LatticeVector, SiteIndex};

/// An `nx × ny × nz` repetition of the unit cell with periodic boundaries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Supercell {
    dims: [i32; 3],
    num_sublattices: usize,
}

impl Supercell {
    /// All dimensions must be positive and at least one sublattice present.
    pub fn new(dims: [i32; 3], num_sublattices: usize) -> Result<Self, CatalogError> {
        if num_sublattices == 0 || dims.iter().any(|&d| d <= 0) {
            return Err(CatalogError::InvalidSupercell {
                dims,
                num_sublattices,
            });
        }
        Ok(Self {
            dims,
            num_sublattices,
        })
    }

    /// A cubic `n × n × n` supercell of a one-site lattice.
    pub fn cubic(n: i32) -> Result<Self, CatalogError> {
        Self::new([n, n, n], 1)
    }

    pub fn dims(&self) -> [i32; 3] {
        self.dims
    }

    fn cells(&self) -> usize {
        (self.dims[0] * self.dims[1] * self.dims[2]) as usize
    }

    /// Wrap a translation into the home supercell.
    pub fn wrap(&self, r: LatticeVector) -> LatticeVector {
        LatticeVector([
            r.0[0].rem_euclid(self.dims[0]),
            r.0[1].rem_euclid(self.dims[1]),
            r.0[2].rem_euclid(self.dims[2]),
        ])
    }
}

impl SiteIndexer for Supercell {
    fn num_sites(&self) -> usize {
        self.cells() * self.num_sublattices
    }

    fn num_sublattices(&self) -> usize {
        self.num_sublattices
    }

    fn index(&self, r: LatticeVector, sublattice: usize) -> SiteIndex {
        let w = self.wrap(r).0;
        let cell = ((w[0] * self.dims[1] + w[1]) * self.dims[2] + w[2]) as usize;
        sublattice * self.cells() + cell
    }

    fn ci_r(&self, index: SiteIndex) -> LatticeSite {
        let cells = self.cells();
        let sublattice = index / cells;
        let cell = (index % cells) as i32;
        let z = cell % self.dims[2];
        let y = (cell / self.dims[2]) % self.dims[1];
        let x = cell / (self.dims[2] * self.dims[1]);
        LatticeSite::new(sublattice, [x, y, z])
    }
}
