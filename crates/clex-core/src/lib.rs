//! # clex-core
//! Foundation types and traits for the lattice cluster-expansion engine.
//!
//! - [`types`]: lattice translations, sites and species labels
//! - [`cluster`]: canonical, translation-invariant decorated clusters
//! - [`symmetry`]: space-group operations acting on sites and vectors
//! - [`supercell`]: diagonal periodic supercell indexing
//! - [`traits`]: contracts for the indexing and kinetic-barrier collaborators

pub mod cluster;
pub mod constants;
pub mod error;
pub mod supercell;
pub mod symmetry;
pub mod traits;
pub mod types;

pub use cluster::{canonicalize, DecoratedCluster};
pub use supercell::Supercell;
pub use symmetry::{SpaceGroup, SymmetryOp};
pub use traits::{ConstantBarrier, KineticBarrier, SiteIndexer};
pub use types::{LatticeSite, LatticeVector, SiteIndex, Species};
