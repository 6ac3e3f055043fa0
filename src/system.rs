use bitvec::prelude::{BitSlice, BitVec};
use bitvec::bitvec;
use rand::Rng;

use crate::energy::{Couplings, EnergyModel};
use crate::neighbors::{Neighborhood, StrideNeighbors};
use crate::spin::Spin;

/// Spin array plus the observables derived from it.
///
/// `energy` is a cache that the Monte Carlo engine moves along with accepted
/// flips; `recalculate_energy` rebuilds it from the spins alone.
#[derive(Clone, Debug)]
pub struct SpinSystem<N = StrideNeighbors> {
    spins: Vec<Spin>,
    model: EnergyModel<N>,
    active: Vec<usize>,
    energy: f64,
    magnetization: i64,
}

impl SpinSystem<StrideNeighbors> {
    /// Sorted spins addressed as a regular grid of `shape`.
    pub fn on_grid(spins: Vec<Spin>, shape: Vec<usize>, couplings: Couplings) -> Self {
        let topology = StrideNeighbors::new(shape, &spins);
        Self::new(spins, topology, couplings)
    }

    #[inline(always)]
    pub fn shape(&self) -> &[usize] {
        self.model.topology().shape()
    }
}

impl<N: Neighborhood> SpinSystem<N> {
    pub fn new(spins: Vec<Spin>, topology: N, couplings: Couplings) -> Self {
        let mut system = Self {
            spins,
            model: EnergyModel::new(topology, couplings),
            active: Vec::new(),
            energy: 0.0,
            magnetization: 0,
        };
        system.recalculate();
        system
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.spins.len()
    }

    #[inline(always)]
    pub fn spins(&self) -> &[Spin] {
        &self.spins
    }

    /// Indices of the active sites, ascending.
    #[inline(always)]
    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    #[inline(always)]
    pub fn couplings(&self) -> &Couplings {
        self.model.couplings()
    }

    /// Cached effective Hamiltonian of the current configuration.
    #[inline(always)]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    #[inline(always)]
    pub fn magnetization(&self) -> i64 {
        self.magnetization
    }

    /// Signed spin values, 0 for inactive sites.
    pub fn spin_values(&self) -> Vec<i8> {
        self.spins.iter().map(Spin::signed_value).collect()
    }

    /// Empty flip mask sized for this system.
    pub fn flip_mask(&self) -> BitVec {
        bitvec![0; self.size()]
    }

    /// Effective Hamiltonian with the listed sites hypothetically reversed.
    pub fn effective_hamiltonian(&self, flips: &[usize]) -> f64 {
        let mut mask = self.flip_mask();
        for &i in flips {
            mask.set(i, true);
        }
        self.effective_hamiltonian_masked(&mask)
    }

    #[inline(always)]
    pub fn effective_hamiltonian_masked(&self, flips: &BitSlice) -> f64 {
        self.model.effective_hamiltonian(&self.spins, flips)
    }

    pub fn reverse_spin(&mut self, spin: usize) {
        let s = &mut self.spins[spin];
        if !s.active {
            return;
        }
        s.reverse();
        self.magnetization += 2 * s.value as i64;
    }

    pub fn reverse_spins(&mut self, spins: impl IntoIterator<Item = usize>) {
        for spin in spins {
            self.reverse_spin(spin)
        }
    }

    /// Reverse `spins` and take `energy` as the new cached effective
    /// Hamiltonian.
    pub fn apply_flips(&mut self, spins: &[usize], energy: f64) {
        self.reverse_spins(spins.iter().copied());
        self.energy = energy;
    }

    pub fn set_all_spins(&mut self, direction: i8) {
        let value = if direction > 0 { 1 } else { -1 };
        for s in self.spins.iter_mut() {
            s.value = value;
        }
        self.recalculate();
    }

    /// Reverse each spin with probability 1/2.
    pub fn randomize(&mut self, rng: &mut impl Rng) -> usize {
        let mut flipped = 0;
        for s in self.spins.iter_mut() {
            if rng.gen_bool(0.5) {
                s.reverse();
                flipped += 1;
            }
        }
        self.recalculate();
        flipped
    }

    pub fn set_active(&mut self, spin: usize, active: bool) {
        self.spins[spin].active = active;
        self.recalculate();
    }

    pub fn recalculate_energy(&mut self) {
        self.energy = self.effective_hamiltonian_masked(&self.flip_mask());
    }

    pub fn recalculate_magnetization(&mut self) {
        self.magnetization = self.spins.iter().map(|s| s.signed_value() as i64).sum();
    }

    fn recalculate(&mut self) {
        self.active = self
            .spins
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect();
        self.recalculate_magnetization();
        self.recalculate_energy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chain(n: usize) -> SpinSystem {
        let spins = (0..n)
            .map(|i| Spin::new(vec![i as f64 / (n - 1) as f64]))
            .collect();
        SpinSystem::on_grid(
            spins,
            vec![n],
            Couplings {
                k: 1.0,
                h: 0.5,
                sigma: 0.0,
            },
        )
    }

    #[test]
    fn fresh_system_is_fully_magnetized() {
        let system = chain(4);
        assert_eq!(system.magnetization(), 4);
        assert_eq!(system.spin_values(), vec![1, 1, 1, 1]);
        // three bonds and four field terms
        assert_relative_eq!(system.energy(), -3.0 - 2.0);
    }

    #[test]
    fn reverse_tracks_magnetization() {
        let mut system = chain(4);
        system.reverse_spins([0, 2]);
        assert_eq!(system.magnetization(), 0);
        system.reverse_spin(0);
        assert_eq!(system.magnetization(), 2);
    }

    #[test]
    fn applied_flips_agree_with_hypothetical_ones() {
        let mut system = chain(5);
        let trial = system.effective_hamiltonian(&[1, 3]);
        system.apply_flips(&[1, 3], trial);

        let cached = system.energy();
        system.recalculate_energy();
        assert_relative_eq!(cached, system.energy(), epsilon = 1e-12);
    }

    #[test]
    fn inactive_sites_are_skipped() {
        let mut system = chain(4);
        system.set_active(1, false);

        assert_eq!(system.active_indices(), &[0, 2, 3]);
        assert_eq!(system.spin_values(), vec![1, 0, 1, 1]);
        assert_eq!(system.magnetization(), 3);

        system.reverse_spin(1);
        assert_eq!(system.magnetization(), 3);
    }

    #[test]
    fn set_all_and_randomize() {
        let mut system = chain(6);
        system.set_all_spins(-3);
        assert_eq!(system.magnetization(), -6);

        let mut rng = StdRng::seed_from_u64(7);
        let flipped = system.randomize(&mut rng);
        assert_eq!(system.magnetization(), -6 + 2 * flipped as i64);
    }
}
