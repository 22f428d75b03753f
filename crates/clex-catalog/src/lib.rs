//! # clex-catalog
//! Concrete, periodic-boundary-resolved interactions of a supercell.
//!
//! - [`catalog`]: interaction registry and per-(site, species) lookup lists
//! - [`persist`]: bincode persistence of a built catalog

pub mod catalog;
pub mod persist;

pub use catalog::{Interaction, InteractionCatalog, VectorRef};
