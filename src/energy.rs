use bitvec::prelude::BitSlice;

use crate::neighbors::Neighborhood;
use crate::spin::Spin;

/// Temperature-reduced couplings of the Hamiltonian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Couplings {
    /// `J / k_BT`
    pub k: f64,
    /// `H / k_BT`
    pub h: f64,
    /// Distance exponent of the pair coupling.
    pub sigma: f64,
}

/// Evaluates `-βH` for the stored configuration with an optional set of
/// hypothetically flipped sites.
#[derive(Clone, Debug)]
pub struct EnergyModel<N> {
    topology: N,
    couplings: Couplings,
}

impl<N: Neighborhood> EnergyModel<N> {
    pub fn new(topology: N, couplings: Couplings) -> Self {
        Self {
            topology,
            couplings,
        }
    }

    #[inline(always)]
    pub fn topology(&self) -> &N {
        &self.topology
    }

    #[inline(always)]
    pub fn couplings(&self) -> &Couplings {
        &self.couplings
    }

    /// Effective Hamiltonian with every site set in `flips` reversed.
    /// `flips` must be at least as long as `spins`.
    pub fn effective_hamiltonian(&self, spins: &[Spin], flips: &BitSlice) -> f64 {
        (0..spins.len())
            .map(|i| self.site_energy(spins, flips, i))
            .sum()
    }

    /// Field term of site `i` plus half of each of its pair terms.
    pub fn site_energy(&self, spins: &[Spin], flips: &BitSlice, i: usize) -> f64 {
        let Couplings { k, h, sigma } = self.couplings;
        let si = &spins[i];
        if !si.active {
            return 0.0;
        }

        let sign_i = flip_sign(flips, i);
        let value_i = (si.value * sign_i) as f64;
        let mut energy = -h * value_i;

        self.topology.for_each_neighbor(spins, i, |j| {
            let sj = &spins[j];
            if !sj.active {
                return;
            }
            let value_j = (sj.value * flip_sign(flips, j)) as f64;
            let coupling = si.distance_sq(sj, sigma).powf(sigma / 2.0);
            energy -= k * coupling * value_i * value_j / 2.0;
        });

        energy
    }
}

#[inline(always)]
fn flip_sign(flips: &BitSlice, i: usize) -> i8 {
    if flips[i] {
        -1
    } else {
        1
    }
}
