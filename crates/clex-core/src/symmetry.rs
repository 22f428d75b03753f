//! Crystal symmetry operations and groups.
//!
//! A [`SymmetryOp`] acts on lattice sites as
//! `(c, R) -> (p(c), M·R + t_c)` where `M` is an integer rotation in lattice
//! coordinates, `p` permutes sublattices and `t_c` is the per-sublattice
//! translation picked up by the basis atom. The same operation carries its
//! Cartesian rotation for vector quantities.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::SymmetryError;
use crate::types::{LatticeSite, LatticeVector};

type IntMatrix = [[i32; 3]; 3];

const IDENTITY: IntMatrix = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];

fn det(m: &IntMatrix) -> i32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse of a unimodular integer matrix via the adjugate.
fn unimodular_inverse(m: &IntMatrix) -> IntMatrix {
    let d = det(m);
    let mut inv = [[0; 3]; 3];
    for (i, row) in inv.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            // adj[i][j] = cofactor[j][i]
            let (r0, r1) = match j {
                0 => (1, 2),
                1 => (0, 2),
                _ => (0, 1),
            };
            let (c0, c1) = match i {
                0 => (1, 2),
                1 => (0, 2),
                _ => (0, 1),
            };
            let minor = m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
            let sign = if (i + j) % 2 == 0 { 1 } else { -1 };
            // det is +-1 so dividing by it equals multiplying by it
            *cell = sign * minor * d;
        }
    }
    inv
}

fn int_mul(a: &IntMatrix, b: &IntMatrix) -> IntMatrix {
    let mut out = [[0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// One space-group operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymmetryOp {
    rotation: IntMatrix,
    cart_rotation: Matrix3<f64>,
    site_map: Vec<(usize, LatticeVector)>,
}

impl SymmetryOp {
    /// Create an operation, checking that the rotation is unimodular and the
    /// sublattice map stays in range.
    ///
    /// `cart_rotation` must be orthogonal; its inverse is taken as the transpose.
    pub fn new(
        rotation: IntMatrix,
        cart_rotation: Matrix3<f64>,
        site_map: Vec<(usize, LatticeVector)>,
    ) -> Result<Self, SymmetryError> {
        let d = det(&rotation);
        if d.abs() != 1 {
            return Err(SymmetryError::NotUnimodular(d));
        }
        let count = site_map.len();
        if let Some(&(bad, _)) = site_map.iter().find(|(c, _)| *c >= count) {
            return Err(SymmetryError::SublatticeOutOfRange {
                sublattice: bad,
                count,
            });
        }
        let mut seen = vec![false; count];
        for &(c, _) in &site_map {
            if std::mem::replace(&mut seen[c], true) {
                return Err(SymmetryError::NotPermutation(c));
            }
        }
        Ok(Self {
            rotation,
            cart_rotation,
            site_map,
        })
    }

    /// The identity on a crystal with `num_sublattices` basis sites.
    pub fn identity(num_sublattices: usize) -> Self {
        Self {
            rotation: IDENTITY,
            cart_rotation: Matrix3::identity(),
            site_map: (0..num_sublattices)
                .map(|c| (c, LatticeVector::ZERO))
                .collect(),
        }
    }

    pub fn rotation(&self) -> &IntMatrix {
        &self.rotation
    }

    pub fn cart_rotation(&self) -> &Matrix3<f64> {
        &self.cart_rotation
    }

    pub fn num_sublattices(&self) -> usize {
        self.site_map.len()
    }

    /// Image of a lattice site under this operation.
    pub fn apply_site(&self, site: &LatticeSite) -> LatticeSite {
        let (sublattice, shift) = self.site_map[site.sublattice];
        LatticeSite {
            sublattice,
            r: site.r.transform(&self.rotation) + shift,
        }
    }

    /// Rotate a Cartesian vector.
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.cart_rotation * v
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &SymmetryOp) -> SymmetryOp {
        let site_map = other
            .site_map
            .iter()
            .map(|&(c, t)| {
                let (c2, t2) = self.site_map[c];
                (c2, t.transform(&self.rotation) + t2)
            })
            .collect();
        SymmetryOp {
            rotation: int_mul(&self.rotation, &other.rotation),
            cart_rotation: self.cart_rotation * other.cart_rotation,
            site_map,
        }
    }

    /// The inverse operation.
    pub fn inverse(&self) -> SymmetryOp {
        let inv_rot = unimodular_inverse(&self.rotation);
        let mut site_map = vec![(0, LatticeVector::ZERO); self.site_map.len()];
        for (c, &(image, t)) in self.site_map.iter().enumerate() {
            // g(c, R) = (image, M R + t)  =>  g^-1(image, R') = (c, M^-1 (R' - t))
            site_map[image] = (c, (-t).transform(&inv_rot));
        }
        SymmetryOp {
            rotation: inv_rot,
            cart_rotation: self.cart_rotation.transpose(),
            site_map,
        }
    }

    /// Whether two operations act identically on sites.
    pub fn same_action(&self, other: &SymmetryOp) -> bool {
        self.rotation == other.rotation && self.site_map == other.site_map
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == IDENTITY
            && self
                .site_map
                .iter()
                .enumerate()
                .all(|(c, &(image, t))| image == c && t == LatticeVector::ZERO)
    }
}

/// A finite set of symmetry operations acting on one crystal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceGroup {
    ops: Vec<SymmetryOp>,
    num_sublattices: usize,
}

impl SpaceGroup {
    /// Wrap a list of operations. All must act on the same number of sublattices.
    pub fn new(ops: Vec<SymmetryOp>) -> Result<Self, SymmetryError> {
        let first = ops.first().ok_or(SymmetryError::EmptyGroup)?;
        let num_sublattices = first.num_sublattices();
        if let Some(bad) = ops.iter().find(|op| op.num_sublattices() != num_sublattices) {
            return Err(SymmetryError::SiteMapSize {
                got: bad.num_sublattices(),
                expected: num_sublattices,
            });
        }
        Ok(Self {
            ops,
            num_sublattices,
        })
    }

    /// The trivial group.
    pub fn identity(num_sublattices: usize) -> Self {
        Self {
            ops: vec![SymmetryOp::identity(num_sublattices)],
            num_sublattices,
        }
    }

    /// Point group of a one-site Bravais lattice.
    ///
    /// `lattice` holds the primitive vectors as columns; `rotations` are the
    /// integer rotations in lattice coordinates. The Cartesian rotation is
    /// `A·M·A⁻¹`.
    pub fn bravais(
        lattice: Matrix3<f64>,
        rotations: &[IntMatrix],
    ) -> Result<Self, SymmetryError> {
        let inv = lattice.try_inverse().ok_or(SymmetryError::SingularLattice)?;
        let ops = rotations
            .iter()
            .map(|m| {
                let mf = Matrix3::from_fn(|i, j| m[i][j] as f64);
                SymmetryOp::new(*m, lattice * mf * inv, vec![(0, LatticeVector::ZERO)])
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ops)
    }

    /// The 48-element full cubic group `Oh` on a simple-cubic lattice.
    pub fn cubic_oh() -> Self {
        const PERMS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut ops = Vec::with_capacity(48);
        for perm in PERMS {
            for signs in 0..8u8 {
                let mut m = [[0; 3]; 3];
                for (i, &p) in perm.iter().enumerate() {
                    m[i][p] = if signs & (1 << i) != 0 { -1 } else { 1 };
                }
                let cart = Matrix3::from_fn(|i, j| m[i][j] as f64);
                ops.push(SymmetryOp {
                    rotation: m,
                    cart_rotation: cart,
                    site_map: vec![(0, LatticeVector::ZERO)],
                });
            }
        }
        Self {
            ops,
            num_sublattices: 1,
        }
    }

    pub fn ops(&self) -> &[SymmetryOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn num_sublattices(&self) -> usize {
        self.num_sublattices
    }

    /// Whether the product of any two operations is again in the set.
    pub fn is_closed(&self) -> bool {
        self.ops.iter().all(|a| {
            self.ops.iter().all(|b| {
                let ab = a.compose(b);
                self.ops.iter().any(|c| c.same_action(&ab))
            })
        })
    }
}
