//! Error types for the cluster-expansion engine.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("site/species length mismatch: {sites} sites, {species} species")] LengthMismatch { sites: usize, species: usize },
    #[error("cluster has no sites")] Empty,
    #[error("duplicate site in cluster: {0}")] DuplicateSite(String),
    #[error("species {species} out of range for alphabet of size {alphabet}")] SpeciesOutOfRange { species: usize, alphabet: usize },
    #[error("sublattice {sublattice} out of range for crystal with {count} sublattices")] SublatticeOutOfRange { sublattice: usize, count: usize },
    #[error("empty species alphabet")] EmptyAlphabet,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymmetryError {
    #[error("site map covers {got} sublattices, expected {expected}")] SiteMapSize { got: usize, expected: usize },
    #[error("sublattice {sublattice} maps outside {count} sublattices")] SublatticeOutOfRange { sublattice: usize, count: usize },
    #[error("sublattice {0} is the image of more than one sublattice")] NotPermutation(usize),
    #[error("rotation is not unimodular (det = {0})")] NotUnimodular(i32),
    #[error("lattice matrix is singular")] SingularLattice,
    #[error("empty group")] EmptyGroup,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("expected {expected} energy coefficients, got {got}")] CoefficientCount { expected: usize, got: usize },
    #[error("site {site} out of range for {num_sites} sites")] SiteOutOfRange { site: usize, num_sites: usize },
    #[error("species {species} out of range for alphabet of size {alphabet}")] SpeciesOutOfRange { species: usize, alphabet: usize },
    #[error("cluster sublattice {sublattice} not present in supercell with {count} sublattices")] SublatticeOutOfRange { sublattice: usize, count: usize },
    #[error("invalid supercell {dims:?} with {num_sublattices} sublattices")] InvalidSupercell { dims: [i32; 3], num_sublattices: usize },
    #[error("serialization: {0}")] Serialization(String),
    #[error("io: {0}")] Io(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KraError {
    #[error("expected {expected} KRA coefficients for transition, got {got}")] CoefficientCount { expected: usize, got: usize },
    #[error("no transition-state clusters for jump {from} -> {to} exchanging species {species}")] UnknownTransition { from: usize, to: usize, species: usize },
    #[error("transition cluster endpoints must differ: {0}")] DegenerateJump(String),
    #[error("transition cluster site {0} is not in the supercell")] SiteOutsideSupercell(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("beta must be non-negative, got {0}")] InvalidBeta(f64),
    #[error("state has {got} sites, catalog has {expected}")] StateLength { got: usize, expected: usize },
    #[error("site {site} holds species {species}, alphabet size is {alphabet}")] InvalidSpecies { site: usize, species: usize, alphabet: usize },
    #[error("swap sites must differ: {0}")] SameSite(usize),
    #[error("random swaps need at least two sites, supercell has {0}")] TooFewSites(usize),
    #[error("site {site} out of range for {num_sites} sites")] SiteOutOfRange { site: usize, num_sites: usize },
    #[error("got {uniforms} uniform draws for {pairs} trial pairs")] UniformCount { pairs: usize, uniforms: usize },
    #[error("jump {from} -> {to}: end site holds {found}, jump expects {expected}")] JumpSpecies { from: usize, to: usize, expected: usize, found: usize },
    #[error("jump {from} -> {to}: start site holds {found}, not the vacancy {vacancy}")] JumpStart { from: usize, to: usize, vacancy: usize, found: usize },
    #[error("transport tensors have {got} sub-orbits, accumulator has {expected}")] TensorShape { got: usize, expected: usize },
    #[error(transparent)] Catalog(#[from] CatalogError),
    #[error(transparent)] Kra(#[from] KraError),
}

#[derive(Error, Debug)]
pub enum ClexError {
    #[error(transparent)] Cluster(#[from] ClusterError),
    #[error(transparent)] Symmetry(#[from] SymmetryError),
    #[error(transparent)] Catalog(#[from] CatalogError),
    #[error(transparent)] Kra(#[from] KraError),
    #[error(transparent)] Simulation(#[from] SimulationError),
}
