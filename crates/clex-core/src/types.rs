//! Core lattice types: translations, sites and species.
//!
//! Sites are addressed exactly by integers. Cartesian quantities live in
//! [`crate::symmetry`]; nothing in here touches floating point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A chemical species label. The vacancy is an ordinary species value.
pub type Species = usize;

/// Index of a site inside a periodic supercell.
pub type SiteIndex = usize;

/// An integer lattice translation in units of the primitive lattice vectors.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct LatticeVector(pub [i32; 3]);

impl LatticeVector {
    /// The zero translation.
    pub const ZERO: Self = Self([0, 0, 0]);

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self([x, y, z])
    }

    /// Component-wise floor division. `n` must be positive.
    pub fn div_floor(&self, n: i32) -> Self {
        Self([
            self.0[0].div_euclid(n),
            self.0[1].div_euclid(n),
            self.0[2].div_euclid(n),
        ])
    }

    /// Apply an integer matrix (row-major) to this vector.
    pub fn transform(&self, m: &[[i32; 3]; 3]) -> Self {
        let v = &self.0;
        Self([
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ])
    }
}

impl Add for LatticeVector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl Sub for LatticeVector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl Neg for LatticeVector {
    type Output = Self;
    fn neg(self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl fmt::Display for LatticeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.0[0], self.0[1], self.0[2])
    }
}

impl From<[i32; 3]> for LatticeVector {
    fn from(v: [i32; 3]) -> Self {
        Self(v)
    }
}

/// A lattice site: sublattice (basis) class plus the unit-cell translation.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct LatticeSite {
    pub sublattice: usize,
    pub r: LatticeVector,
}

impl LatticeSite {
    pub fn new(sublattice: usize, r: impl Into<LatticeVector>) -> Self {
        Self {
            sublattice,
            r: r.into(),
        }
    }

    /// The same basis site shifted by `t`.
    pub fn translated(&self, t: LatticeVector) -> Self {
        Self {
            sublattice: self.sublattice,
            r: self.r + t,
        }
    }
}

impl fmt::Display for LatticeSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sublattice, self.r)
    }
}
