//! # clex-orbit
//! Symmetry-distinct decorated-cluster orbits and their vector basis.
//!
//! - [`enumerate`]: species decoration of geometric templates, budget filtering
//!   and orbit closure under a [`SpaceGroup`](clex_core::SpaceGroup)
//! - [`vector_basis`]: stabilizer-invariant directions and vector sub-orbits

pub mod enumerate;
pub mod vector_basis;

pub use enumerate::{
    enumerate_orbits, ClusterOrbit, ClusterTemplate, EnumerationStats, SpeciesAssignments,
    SpeciesBudget,
};
pub use vector_basis::{VectorBasis, VectorEntry, VectorSubOrbit};
