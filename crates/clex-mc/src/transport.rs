//! Transport-coefficient expansion over vacancy jumps.
//!
//! For each jump out of a fixed state the exchange is applied to the offsite
//! counts exactly like a Monte Carlo trial. Every interaction that turns off
//! subtracts its vector-basis directions from `delta_lambda`, every one that
//! turns on adds them. The counts are then reverted, so the state's counts
//! are unchanged after the expansion.
//!
//! With `rate = exp(-(dE / 2 + E_kra) * beta)`:
//! - `Wbar[i][j] += rate * (dl_i · dl_j)`
//! - `Bbar[i] += rate * (dl_i · dx)`

use std::collections::HashMap;
use std::time::Instant;

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use clex_catalog::InteractionCatalog;
use clex_core::error::SimulationError;
use clex_core::traits::KineticBarrier;
use clex_core::types::{SiteIndex, Species};

use crate::engine::{check_beta, check_state};
use crate::offsite::OffsiteCounts;

/// A vacancy on `from` exchanging with `species` on `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Jump {
    pub from: SiteIndex,
    pub to: SiteIndex,
    pub species: Species,
    /// Cartesian displacement of the vacancy.
    pub displacement: Vector3<f64>,
}

/// KRA coefficients per `(from, to, exchanging species)`.
pub type KraCoefficients = HashMap<(SiteIndex, SiteIndex, Species), Vec<f64>>;

/// Everything computed for one jump.
#[derive(Clone, Debug, PartialEq)]
pub struct JumpEvaluation {
    pub delta_e: f64,
    pub e_kra: f64,
    pub rate: f64,
    /// Change of the vector-basis projection, one entry per sub-orbit.
    pub delta_lambda: Vec<Vector3<f64>>,
}

/// Rate-weighted transport tensors of one state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransportCoefficients {
    pub wbar: DMatrix<f64>,
    pub bbar: DVector<f64>,
    pub rates: Vec<f64>,
}

/// Vector-basis projection `lambda` of a state, summed from scratch.
pub fn lambda_of(catalog: &InteractionCatalog, state: &[Species]) -> Vec<Vector3<f64>> {
    let mut lambda = vec![Vector3::<f64>::zeros(); catalog.num_sub_orbits()];
    for interaction in catalog.interactions() {
        if interaction.offsite_in(state) == 0 {
            for v in &interaction.vectors {
                lambda[v.sub_orbit] += Vector3::from(v.direction);
            }
        }
    }
    lambda
}

/// Expands jumps into transport tensors using a kinetic-barrier oracle.
pub struct TransportExpander<'a, K: KineticBarrier + ?Sized> {
    catalog: &'a InteractionCatalog,
    energies: Vec<f64>,
    barrier: &'a K,
    kra: &'a KraCoefficients,
    beta: f64,
}

impl<'a, K: KineticBarrier + ?Sized> TransportExpander<'a, K> {
    /// `beta` must be finite and non-negative.
    pub fn new(
        catalog: &'a InteractionCatalog,
        coefficients: &[f64],
        barrier: &'a K,
        kra: &'a KraCoefficients,
        beta: f64,
    ) -> Result<Self, SimulationError> {
        check_beta(beta)?;
        if beta.is_infinite() {
            return Err(SimulationError::InvalidBeta(beta));
        }
        Ok(Self {
            catalog,
            energies: catalog.energies(coefficients)?,
            barrier,
            kra,
            beta,
        })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    fn check_jump(&self, state: &[Species], jump: &Jump) -> Result<(), SimulationError> {
        let num_sites = state.len();
        for site in [jump.from, jump.to] {
            if site >= num_sites {
                return Err(SimulationError::SiteOutOfRange { site, num_sites });
            }
        }
        if jump.from == jump.to {
            return Err(SimulationError::SameSite(jump.from));
        }
        let vacancy = self.catalog.vacancy();
        if state[jump.from] != vacancy {
            return Err(SimulationError::JumpStart {
                from: jump.from,
                to: jump.to,
                vacancy,
                found: state[jump.from],
            });
        }
        if state[jump.to] != jump.species {
            return Err(SimulationError::JumpSpecies {
                from: jump.from,
                to: jump.to,
                expected: jump.species,
                found: state[jump.to],
            });
        }
        Ok(())
    }

    /// Energy change, barrier, rate and `delta_lambda` of one jump.
    ///
    /// `offsite` must describe `state`; it is restored before returning.
    pub fn evaluate_jump(
        &self,
        state: &[Species],
        offsite: &mut OffsiteCounts,
        jump: &Jump,
    ) -> Result<JumpEvaluation, SimulationError> {
        self.check_jump(state, jump)?;
        let coefficients = self
            .kra
            .get(&(jump.from, jump.to, jump.species))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let e_kra = self
            .barrier
            .barrier(jump.from, jump.to, jump.species, state, coefficients)?;

        let catalog = self.catalog;
        let energies = &self.energies;
        let mut delta_e = 0.0;
        let mut delta_lambda = vec![Vector3::<f64>::zeros(); catalog.num_sub_orbits()];
        let start = (jump.from, catalog.vacancy());
        let end = (jump.to, jump.species);
        offsite.apply_exchange(catalog, start, end, |id, on| {
            let sign = if on { 1.0 } else { -1.0 };
            delta_e += sign * energies[id];
            for v in &catalog.interactions()[id].vectors {
                delta_lambda[v.sub_orbit] += Vector3::from(v.direction) * sign;
            }
        });
        offsite.revert_exchange(catalog, start, end);

        let rate = (-(0.5 * delta_e + e_kra) * self.beta).exp();
        Ok(JumpEvaluation {
            delta_e,
            e_kra,
            rate,
            delta_lambda,
        })
    }

    /// Expand `jumps` out of `state`, counting mismatches from scratch.
    pub fn expand(
        &self,
        state: &[Species],
        jumps: &[Jump],
    ) -> Result<TransportCoefficients, SimulationError> {
        check_state(self.catalog, state)?;
        let mut offsite = OffsiteCounts::new(self.catalog, state);
        self.expand_with(state, &mut offsite, jumps)
    }

    /// Expand `jumps` reusing counts that already describe `state`.
    pub fn expand_with(
        &self,
        state: &[Species],
        offsite: &mut OffsiteCounts,
        jumps: &[Jump],
    ) -> Result<TransportCoefficients, SimulationError> {
        let start = Instant::now();
        let n = self.catalog.num_sub_orbits();
        let mut wbar = DMatrix::<f64>::zeros(n, n);
        let mut bbar = DVector::<f64>::zeros(n);
        let mut rates = Vec::with_capacity(jumps.len());

        for jump in jumps {
            let eval = self.evaluate_jump(state, offsite, jump)?;
            let dl = &eval.delta_lambda;
            for i in 0..n {
                for j in 0..n {
                    wbar[(i, j)] += eval.rate * dl[i].dot(&dl[j]);
                }
                bbar[i] += eval.rate * dl[i].dot(&jump.displacement);
            }
            rates.push(eval.rate);
        }

        debug!(
            jumps = jumps.len(),
            sub_orbits = n,
            elapsed_us = start.elapsed().as_micros() as u64,
            "transport expansion"
        );
        Ok(TransportCoefficients { wbar, bbar, rates })
    }
}

/// Running sums of transport tensors over sampled states.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransportAccumulator {
    wbar: DMatrix<f64>,
    bbar: DVector<f64>,
    samples: u64,
}

impl TransportAccumulator {
    pub fn new(num_sub_orbits: usize) -> Self {
        Self {
            wbar: DMatrix::zeros(num_sub_orbits, num_sub_orbits),
            bbar: DVector::zeros(num_sub_orbits),
            samples: 0,
        }
    }

    pub fn add(&mut self, sample: &TransportCoefficients) -> Result<(), SimulationError> {
        if sample.bbar.len() != self.bbar.len() || sample.wbar.shape() != self.wbar.shape() {
            return Err(SimulationError::TensorShape {
                got: sample.bbar.len(),
                expected: self.bbar.len(),
            });
        }
        self.wbar += &sample.wbar;
        self.bbar += &sample.bbar;
        self.samples += 1;
        Ok(())
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Sample means of Wbar and Bbar; `None` before the first sample.
    pub fn mean(&self) -> Option<(DMatrix<f64>, DVector<f64>)> {
        if self.samples == 0 {
            return None;
        }
        let n = self.samples as f64;
        Some((&self.wbar / n, &self.bbar / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clex_core::supercell::Supercell;
    use clex_core::symmetry::SpaceGroup;
    use clex_core::traits::ConstantBarrier;
    use clex_core::types::LatticeSite;
    use clex_orbit::{enumerate_orbits, ClusterTemplate, SpeciesBudget, VectorBasis};

    const A: Species = 0;
    const B: Species = 1;
    const V: Species = 2;
    const EPS: f64 = 1e-10;

    fn catalog() -> InteractionCatalog {
        let group = SpaceGroup::cubic_oh();
        let budget = SpeciesBudget::new(vec![2, 2, 1], V).unwrap();
        let s = |r: [i32; 3]| LatticeSite::new(0, r);
        let templates = vec![
            ClusterTemplate::single(s([0, 0, 0])),
            ClusterTemplate::pair(s([0, 0, 0]), s([1, 0, 0])).unwrap(),
        ];
        let (orbits, _) = enumerate_orbits(&templates, &budget, &group).unwrap();
        let basis = VectorBasis::build(&orbits, &group);
        InteractionCatalog::build(&orbits, &basis, &Supercell::cubic(3).unwrap(), &budget)
            .unwrap()
    }

    fn coefficients(cat: &InteractionCatalog) -> Vec<f64> {
        (0..cat.num_orbits()).map(|i| 0.05 * i as f64 - 0.1).collect()
    }

    // vacancy at the origin, B on +x, A elsewhere except a B at (0, 1, 1)
    fn state() -> Vec<Species> {
        let mut st = vec![A; 27];
        st[0] = V;
        st[9] = B;
        st[4] = B;
        st
    }

    fn jumps() -> Vec<Jump> {
        vec![
            Jump { from: 0, to: 9, species: B, displacement: Vector3::new(1.0, 0.0, 0.0) },
            Jump { from: 0, to: 1, species: A, displacement: Vector3::new(0.0, 0.0, 1.0) },
            Jump { from: 0, to: 3, species: A, displacement: Vector3::new(0.0, 1.0, 0.0) },
        ]
    }

    fn energy_of(cat: &InteractionCatalog, e: &[f64], st: &[Species]) -> f64 {
        cat.interactions()
            .iter()
            .zip(e)
            .filter(|(i, _)| i.offsite_in(st) == 0)
            .map(|(_, e)| e)
            .sum()
    }

    // --- construction ---

    #[test]
    fn rejects_infinite_beta() {
        let cat = catalog();
        let kra = KraCoefficients::new();
        let b = ConstantBarrier(0.0);
        assert!(matches!(
            TransportExpander::new(&cat, &coefficients(&cat), &b, &kra, f64::INFINITY),
            Err(SimulationError::InvalidBeta(_))
        ));
    }

    // --- jump evaluation ---

    #[test]
    fn jump_matches_brute_force() {
        let cat = catalog();
        let c = coefficients(&cat);
        let e = cat.energies(&c).unwrap();
        let kra = KraCoefficients::new();
        let barrier = ConstantBarrier(0.3);
        let exp = TransportExpander::new(&cat, &c, &barrier, &kra, 2.0).unwrap();
        let st = state();
        let mut off = OffsiteCounts::new(&cat, &st);
        let before = off.clone();

        for jump in jumps() {
            let eval = exp.evaluate_jump(&st, &mut off, &jump).unwrap();
            assert_eq!(off, before);

            let mut after = st.clone();
            after.swap(jump.from, jump.to);
            let de = energy_of(&cat, &e, &after) - energy_of(&cat, &e, &st);
            assert!((eval.delta_e - de).abs() < EPS);

            let l0 = lambda_of(&cat, &st);
            let l1 = lambda_of(&cat, &after);
            for k in 0..cat.num_sub_orbits() {
                assert!((eval.delta_lambda[k] - (l1[k] - l0[k])).norm() < EPS);
            }
            let rate = (-(0.5 * de + 0.3) * 2.0f64).exp();
            assert!((eval.rate - rate).abs() < EPS);
        }
    }

    #[test]
    fn jump_validation() {
        let cat = catalog();
        let c = coefficients(&cat);
        let kra = KraCoefficients::new();
        let barrier = ConstantBarrier(0.0);
        let exp = TransportExpander::new(&cat, &c, &barrier, &kra, 1.0).unwrap();
        let st = state();
        let mut off = OffsiteCounts::new(&cat, &st);
        let wrong_species = Jump { from: 0, to: 9, species: A, displacement: Vector3::zeros() };
        assert!(matches!(
            exp.evaluate_jump(&st, &mut off, &wrong_species),
            Err(SimulationError::JumpSpecies { expected: A, found: B, .. })
        ));
        let no_vacancy = Jump { from: 1, to: 2, species: A, displacement: Vector3::zeros() };
        assert!(matches!(
            exp.evaluate_jump(&st, &mut off, &no_vacancy),
            Err(SimulationError::JumpStart { vacancy: V, found: A, .. })
        ));
    }

    // --- tensors ---

    #[test]
    fn wbar_symmetric_and_positive() {
        let cat = catalog();
        let kra = KraCoefficients::new();
        let barrier = ConstantBarrier(0.1);
        let exp = TransportExpander::new(&cat, &coefficients(&cat), &barrier, &kra, 1.0).unwrap();
        let out = exp.expand(&state(), &jumps()).unwrap();
        assert_eq!(out.rates.len(), 3);
        let n = cat.num_sub_orbits();
        assert_eq!(out.wbar.shape(), (n, n));
        assert!((&out.wbar - out.wbar.transpose()).norm() < EPS);
        for i in 0..n {
            assert!(out.wbar[(i, i)] >= 0.0);
        }
    }

    #[test]
    fn expand_with_leaves_counts() {
        let cat = catalog();
        let kra = KraCoefficients::new();
        let barrier = ConstantBarrier(0.0);
        let exp = TransportExpander::new(&cat, &coefficients(&cat), &barrier, &kra, 1.0).unwrap();
        let st = state();
        let mut off = OffsiteCounts::new(&cat, &st);
        let before = off.clone();
        let with = exp.expand_with(&st, &mut off, &jumps()).unwrap();
        assert_eq!(off, before);
        assert_eq!(with, exp.expand(&st, &jumps()).unwrap());
    }

    // --- accumulator ---

    #[test]
    fn accumulator_averages() {
        let mut acc = TransportAccumulator::new(2);
        assert!(acc.mean().is_none());
        let a = TransportCoefficients {
            wbar: DMatrix::from_element(2, 2, 1.0),
            bbar: DVector::from_element(2, 2.0),
            rates: vec![],
        };
        let b = TransportCoefficients {
            wbar: DMatrix::from_element(2, 2, 3.0),
            bbar: DVector::from_element(2, 0.0),
            rates: vec![],
        };
        acc.add(&a).unwrap();
        acc.add(&b).unwrap();
        let (w, bb) = acc.mean().unwrap();
        assert_eq!(acc.samples(), 2);
        assert_eq!(w, DMatrix::from_element(2, 2, 2.0));
        assert_eq!(bb, DVector::from_element(2, 1.0));
    }

    #[test]
    fn accumulator_rejects_shape() {
        let mut acc = TransportAccumulator::new(1);
        let bad = TransportCoefficients {
            wbar: DMatrix::zeros(2, 2),
            bbar: DVector::zeros(2),
            rates: vec![],
        };
        assert_eq!(
            acc.add(&bad).unwrap_err(),
            SimulationError::TensorShape { got: 2, expected: 1 }
        );
    }
}
