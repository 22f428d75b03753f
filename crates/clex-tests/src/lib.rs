//! Cross-crate test suite for the clex engine.
//!
//! Integration tests under `tests/` exercise the full pipeline from cluster
//! templates to Monte Carlo sweeps and transport tensors. Shared lattice
//! fixtures live in [`helpers`].

pub mod helpers;
