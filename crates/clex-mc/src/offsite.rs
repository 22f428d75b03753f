//! Offsite counts.
//!
//! `offsite[i]` is the number of members of interaction `i` whose species is
//! not the one currently occupying their site. An interaction is active, and
//! contributes its energy, exactly when its count is zero.
//!
//! Exchanging species `a` on site `A` with `b` on site `B` updates four
//! lookup lists in order:
//! 1. `(A, a)` and 2. `(B, b)`: increment, turning off anything that was active;
//! 3. `(A, b)` and 4. `(B, a)`: decrement, turning on anything that reaches zero.
//!
//! Each group reads the counts left by the previous one, so an interaction
//! listed in several groups is only toggled on its actual zero crossings.

use serde::{Deserialize, Serialize};

use clex_catalog::InteractionCatalog;
use clex_core::types::{SiteIndex, Species};

/// Per-interaction offsite counts for one simulation state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OffsiteCounts {
    counts: Vec<u32>,
}

impl OffsiteCounts {
    /// Count mismatches of every interaction in `state`.
    pub fn new(catalog: &InteractionCatalog, state: &[Species]) -> Self {
        Self {
            counts: catalog.offsite_counts(state),
        }
    }

    pub fn recompute(&mut self, catalog: &InteractionCatalog, state: &[Species]) {
        self.counts = catalog.offsite_counts(state);
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn is_active(&self, id: usize) -> bool {
        self.counts.get(id) == Some(&0)
    }

    /// Ids of all active interactions.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == 0)
            .map(|(id, _)| id)
    }

    /// Apply the four update groups of exchanging `a` at `site_a` with `b` at
    /// `site_b`.
    ///
    /// `toggle(id, on)` fires whenever interaction `id` turns off (`on == false`)
    /// or back on (`on == true`).
    pub fn apply_exchange(
        &mut self,
        catalog: &InteractionCatalog,
        (site_a, a): (SiteIndex, Species),
        (site_b, b): (SiteIndex, Species),
        mut toggle: impl FnMut(usize, bool),
    ) {
        for (site, spec) in [(site_a, a), (site_b, b)] {
            for &id in catalog.interactions_at(site, spec) {
                if self.counts[id] == 0 {
                    toggle(id, false);
                }
                self.counts[id] += 1;
            }
        }
        for (site, spec) in [(site_a, b), (site_b, a)] {
            for &id in catalog.interactions_at(site, spec) {
                self.counts[id] -= 1;
                if self.counts[id] == 0 {
                    toggle(id, true);
                }
            }
        }
    }

    /// Undo [`apply_exchange`](Self::apply_exchange) for the same arguments.
    pub fn revert_exchange(
        &mut self,
        catalog: &InteractionCatalog,
        (site_a, a): (SiteIndex, Species),
        (site_b, b): (SiteIndex, Species),
    ) {
        for (site, spec) in [(site_a, a), (site_b, b)] {
            for &id in catalog.interactions_at(site, spec) {
                self.counts[id] -= 1;
            }
        }
        for (site, spec) in [(site_a, b), (site_b, a)] {
            for &id in catalog.interactions_at(site, spec) {
                self.counts[id] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clex_core::supercell::Supercell;
    use clex_core::symmetry::SpaceGroup;
    use clex_core::types::LatticeSite;
    use clex_orbit::{enumerate_orbits, ClusterTemplate, SpeciesBudget, VectorBasis};

    const A: Species = 0;
    const B: Species = 1;
    const V: Species = 2;

    fn catalog(n: i32) -> InteractionCatalog {
        let group = SpaceGroup::cubic_oh();
        let budget = SpeciesBudget::new(vec![2, 2, 1], V).unwrap();
        let s = |r: [i32; 3]| LatticeSite::new(0, r);
        let templates = vec![
            ClusterTemplate::single(s([0, 0, 0])),
            ClusterTemplate::pair(s([0, 0, 0]), s([1, 0, 0])).unwrap(),
        ];
        let (orbits, _) = enumerate_orbits(&templates, &budget, &group).unwrap();
        let basis = VectorBasis::build(&orbits, &group);
        InteractionCatalog::build(&orbits, &basis, &Supercell::cubic(n).unwrap(), &budget)
            .unwrap()
    }

    fn state(n: usize) -> Vec<Species> {
        (0..n).map(|i| [A, B, A, V, B][i % 5]).collect()
    }

    #[test]
    fn new_matches_catalog_counts() {
        let cat = catalog(3);
        let st = state(cat.num_sites());
        let off = OffsiteCounts::new(&cat, &st);
        assert_eq!(off.len(), cat.len());
        for (id, interaction) in cat.interactions().iter().enumerate() {
            assert_eq!(off.as_slice()[id], interaction.offsite_in(&st));
        }
    }

    #[test]
    fn exchange_reaches_recomputed_counts() {
        let cat = catalog(3);
        let mut st = state(cat.num_sites());
        let mut off = OffsiteCounts::new(&cat, &st);
        let (sa, sb) = (0, 3);
        let (a, b) = (st[sa], st[sb]);
        off.apply_exchange(&cat, (sa, a), (sb, b), |_, _| {});
        st.swap(sa, sb);
        assert_eq!(off, OffsiteCounts::new(&cat, &st));
    }

    #[test]
    fn revert_restores_counts() {
        let cat = catalog(3);
        let st = state(cat.num_sites());
        let before = OffsiteCounts::new(&cat, &st);
        let mut off = before.clone();
        off.apply_exchange(&cat, (1, st[1]), (7, st[7]), |_, _| {});
        off.revert_exchange(&cat, (1, st[1]), (7, st[7]));
        assert_eq!(off, before);
    }

    #[test]
    fn toggles_track_active_set() {
        let cat = catalog(3);
        let mut st = state(cat.num_sites());
        let mut off = OffsiteCounts::new(&cat, &st);
        let mut active: Vec<bool> = (0..cat.len()).map(|id| off.is_active(id)).collect();
        let (sa, sb) = (2, 3);
        let (a, b) = (st[sa], st[sb]);
        off.apply_exchange(&cat, (sa, a), (sb, b), |id, on| {
            assert_ne!(active[id], on);
            active[id] = on;
        });
        st.swap(sa, sb);
        let fresh = OffsiteCounts::new(&cat, &st);
        for (id, is_on) in active.iter().enumerate() {
            assert_eq!(*is_on, fresh.is_active(id));
        }
    }

    #[test]
    fn active_lists_zero_counts() {
        let cat = catalog(2);
        let st = vec![A; cat.num_sites()];
        let off = OffsiteCounts::new(&cat, &st);
        for id in off.active() {
            assert!(cat.interactions()[id].members.iter().all(|&(_, s)| s == A));
        }
        assert!(!off.is_active(usize::MAX));
    }
}
